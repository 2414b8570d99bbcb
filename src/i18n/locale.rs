//! One locale's display strings, raw (as parsed) and resolved.

use serde::{Deserialize, Serialize};

use crate::domain::{ActionKind, RootContext, TreeError};

/// Action labels as parsed; `None` means "not specified, inherit".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawActions {
    pub create_before: Option<String>,
    pub create_after: Option<String>,
    pub create_first_child: Option<String>,
    pub create_last_child: Option<String>,
    pub update: Option<String>,
    pub delete: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawMessages {
    pub on_delete: Option<String>,
    pub on_new_root_not_allowed: Option<String>,
    pub on_move_in_descendant: Option<String>,
    pub on_move_as_root: Option<String>,
}

/// Locale file contents for intermediate parsing and merging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawLocale {
    pub save: Option<String>,
    pub cancel: Option<String>,
    pub action: Option<String>,
    pub actions: RawActions,
    pub messages: RawMessages,
}

fn pick(overlay: &Option<String>, base: &Option<String>) -> Option<String> {
    overlay.clone().or_else(|| base.clone())
}

impl RawLocale {
    /// Overlay wins for every key it specifies.
    pub fn merge(&self, overlay: &RawLocale) -> Self {
        let (a, o) = (&self.actions, &overlay.actions);
        let (m, om) = (&self.messages, &overlay.messages);
        Self {
            save: pick(&overlay.save, &self.save),
            cancel: pick(&overlay.cancel, &self.cancel),
            action: pick(&overlay.action, &self.action),
            actions: RawActions {
                create_before: pick(&o.create_before, &a.create_before),
                create_after: pick(&o.create_after, &a.create_after),
                create_first_child: pick(&o.create_first_child, &a.create_first_child),
                create_last_child: pick(&o.create_last_child, &a.create_last_child),
                update: pick(&o.update, &a.update),
                delete: pick(&o.delete, &a.delete),
            },
            messages: RawMessages {
                on_delete: pick(&om.on_delete, &m.on_delete),
                on_new_root_not_allowed: pick(
                    &om.on_new_root_not_allowed,
                    &m.on_new_root_not_allowed,
                ),
                on_move_in_descendant: pick(&om.on_move_in_descendant, &m.on_move_in_descendant),
                on_move_as_root: pick(&om.on_move_as_root, &m.on_move_as_root),
            },
        }
    }

    /// Dotted names of the keys this locale leaves unspecified.
    pub fn missing_keys(&self) -> Vec<&'static str> {
        let a = &self.actions;
        let m = &self.messages;
        [
            ("save", &self.save),
            ("cancel", &self.cancel),
            ("action", &self.action),
            ("actions.createBefore", &a.create_before),
            ("actions.createAfter", &a.create_after),
            ("actions.createFirstChild", &a.create_first_child),
            ("actions.createLastChild", &a.create_last_child),
            ("actions.update", &a.update),
            ("actions.delete", &a.delete),
            ("messages.onDelete", &m.on_delete),
            ("messages.onNewRootNotAllowed", &m.on_new_root_not_allowed),
            ("messages.onMoveInDescendant", &m.on_move_in_descendant),
            ("messages.onMoveAsRoot", &m.on_move_as_root),
        ]
        .into_iter()
        .filter(|(_, v)| v.is_none())
        .map(|(k, _)| k)
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionLabels {
    pub create_before: String,
    pub create_after: String,
    pub create_first_child: String,
    pub create_last_child: String,
    pub update: String,
    pub delete: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Messages {
    /// Delete confirmation; `{name}` and `{count}` are substituted
    pub on_delete: String,
    pub on_new_root_not_allowed: String,
    pub on_move_in_descendant: String,
    pub on_move_as_root: String,
}

/// Fully resolved locale: every key present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Locale {
    /// Requested code, which may differ from the catalogs it was built from
    pub code: String,
    pub save: String,
    pub cancel: String,
    pub action: String,
    pub actions: ActionLabels,
    pub messages: Messages,
}

impl Locale {
    /// Build from a raw locale; keys it lacks are named after themselves.
    pub(crate) fn from_raw(code: &str, raw: &RawLocale) -> Self {
        let get = |value: &Option<String>, key: &str| value.clone().unwrap_or_else(|| key.to_string());
        let a = &raw.actions;
        let m = &raw.messages;
        Self {
            code: code.to_string(),
            save: get(&raw.save, "save"),
            cancel: get(&raw.cancel, "cancel"),
            action: get(&raw.action, "action"),
            actions: ActionLabels {
                create_before: get(&a.create_before, "createBefore"),
                create_after: get(&a.create_after, "createAfter"),
                create_first_child: get(&a.create_first_child, "createFirstChild"),
                create_last_child: get(&a.create_last_child, "createLastChild"),
                update: get(&a.update, "update"),
                delete: get(&a.delete, "delete"),
            },
            messages: Messages {
                on_delete: get(&m.on_delete, "onDelete"),
                on_new_root_not_allowed: get(&m.on_new_root_not_allowed, "onNewRootNotAllowed"),
                on_move_in_descendant: get(&m.on_move_in_descendant, "onMoveInDescendant"),
                on_move_as_root: get(&m.on_move_as_root, "onMoveAsRoot"),
            },
        }
    }

    /// Menu label of an action; moves are gestures and have none.
    pub fn action_label(&self, action: ActionKind) -> Option<&str> {
        let a = &self.actions;
        match action {
            ActionKind::CreateBefore => Some(&a.create_before),
            ActionKind::CreateAfter => Some(&a.create_after),
            ActionKind::CreateFirstChild => Some(&a.create_first_child),
            ActionKind::CreateLastChild => Some(&a.create_last_child),
            ActionKind::Update => Some(&a.update),
            ActionKind::Delete => Some(&a.delete),
            ActionKind::Move => None,
        }
    }

    /// User-facing message for a structural rejection.
    pub fn message_for(&self, error: &TreeError) -> Option<&str> {
        match error {
            TreeError::DescendantViolation { .. } => Some(&self.messages.on_move_in_descendant),
            TreeError::RootNotAllowed {
                context: RootContext::Create,
            } => Some(&self.messages.on_new_root_not_allowed),
            TreeError::RootNotAllowed {
                context: RootContext::Move,
            } => Some(&self.messages.on_move_as_root),
            _ => None,
        }
    }

    pub fn delete_prompt(&self, name: &str, count: usize) -> String {
        self.messages
            .on_delete
            .replace("{name}", name)
            .replace("{count}", &count.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NodeId;

    fn raw(save: Option<&str>, on_delete: Option<&str>) -> RawLocale {
        RawLocale {
            save: save.map(String::from),
            messages: RawMessages {
                on_delete: on_delete.map(String::from),
                ..RawMessages::default()
            },
            ..RawLocale::default()
        }
    }

    #[test]
    fn given_overlay_when_merging_then_specified_keys_win() {
        let base = raw(Some("Save"), Some("Delete?"));
        let overlay = raw(Some("Sichern"), None);

        let merged = base.merge(&overlay);

        assert_eq!(merged.save.as_deref(), Some("Sichern"));
        assert_eq!(merged.messages.on_delete.as_deref(), Some("Delete?"));
    }

    #[test]
    fn given_partial_locale_when_listing_missing_then_dotted_keys() {
        let missing = raw(Some("Save"), None).missing_keys();
        assert!(missing.contains(&"messages.onDelete"));
        assert!(missing.contains(&"actions.delete"));
        assert!(!missing.contains(&"save"));
        assert_eq!(missing.len(), 12);
    }

    #[test]
    fn given_template_when_building_delete_prompt_then_substituted() {
        let locale = Locale::from_raw("en", &raw(None, Some("Delete {name} ({count})?")));
        assert_eq!(locale.delete_prompt("docs", 5), "Delete docs (5)?");
    }

    #[test]
    fn given_structural_errors_when_looking_up_message_then_mapped() {
        let locale = Locale::from_raw("xx", &RawLocale::default());
        let descendant = TreeError::DescendantViolation {
            source_id: NodeId::from("1"),
            target: NodeId::from("2"),
        };
        assert_eq!(locale.message_for(&descendant), Some("onMoveInDescendant"));
        assert_eq!(
            locale.message_for(&TreeError::RootNotAllowed {
                context: RootContext::Move
            }),
            Some("onMoveAsRoot")
        );
        assert_eq!(locale.message_for(&TreeError::validation("x")), None);
        assert_eq!(locale.action_label(ActionKind::Move), None);
    }
}
