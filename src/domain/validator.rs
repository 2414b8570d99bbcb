//! Structural validation for moves and create placements.
//!
//! Rules are evaluated in order and the first match wins:
//! unknown nodes, descendant violations, root attachment, then acceptance.

use tracing::debug;

use crate::domain::arena::TreeArena;
use crate::domain::entities::{
    CreateAction, KindIcons, MovePlan, NodeId, NodeKind, Placement, Position, Target,
};
use crate::domain::error::{RootContext, TreeError, TreeResult};

/// Gatekeeper for drag-and-drop gestures and insert actions.
pub struct MoveValidator<'a> {
    arena: &'a TreeArena,
    allow_root: bool,
}

impl<'a> MoveValidator<'a> {
    pub fn new(arena: &'a TreeArena, allow_root: bool) -> Self {
        Self { arena, allow_root }
    }

    /// Decide whether moving `source` relative to `target` is legal.
    pub fn validate_move(
        &self,
        source: &NodeId,
        target: &Target,
        position: Position,
    ) -> TreeResult<MovePlan> {
        if !self.arena.contains(source) {
            return Err(TreeError::unknown_node(source));
        }
        if !self.arena.has_target(target) {
            return Err(TreeError::validation(format!("unknown drop target: {target}")));
        }

        if let Target::Node(t) = target {
            if t == source || self.arena.is_descendant(t, source) {
                debug!("validate_move: {t} is inside subtree of {source}");
                return Err(TreeError::DescendantViolation {
                    source_id: source.clone(),
                    target: t.clone(),
                });
            }
        }

        let new_parent = match (target, position) {
            (Target::Root, Position::Into) => Target::Root,
            (Target::Root, _) => {
                return Err(TreeError::validation(
                    "before/after needs a node as drop target",
                ))
            }
            (Target::Node(t), Position::Into) => Target::Node(t.clone()),
            (Target::Node(t), _) => self.arena.parent_of(t)?,
        };
        if new_parent.is_root() && !self.allow_root {
            return Err(TreeError::RootNotAllowed {
                context: RootContext::Move,
            });
        }

        let siblings: Vec<NodeId> = self
            .arena
            .child_ids(&new_parent)
            .into_iter()
            .filter(|id| id != source)
            .collect();
        let index = match (target, position) {
            (Target::Node(t), Position::Before) => sibling_index(&siblings, t)?,
            (Target::Node(t), Position::After) => sibling_index(&siblings, t)? + 1,
            _ => siblings.len(),
        };

        Ok(MovePlan {
            source: source.clone(),
            old_parent: self.arena.parent_of(source)?,
            new_parent,
            index,
        })
    }

    /// Compute where an insert action relative to `anchor` lands.
    pub fn place_create(&self, action: CreateAction, anchor: &Target) -> TreeResult<Placement> {
        if !self.arena.has_target(anchor) {
            return Err(TreeError::validation(format!("unknown anchor: {anchor}")));
        }
        let placement = match (action, anchor) {
            (CreateAction::CreateBefore | CreateAction::CreateAfter, Target::Root) => {
                return Err(TreeError::validation(
                    "before/after needs a node as anchor",
                ))
            }
            (CreateAction::CreateBefore, Target::Node(a)) => Placement {
                parent: self.arena.parent_of(a)?,
                index: self.arena.position_in_parent(a)?,
            },
            (CreateAction::CreateAfter, Target::Node(a)) => Placement {
                parent: self.arena.parent_of(a)?,
                index: self.arena.position_in_parent(a)? + 1,
            },
            (CreateAction::CreateFirstChild, parent) => Placement {
                parent: parent.clone(),
                index: 0,
            },
            (CreateAction::CreateLastChild, parent) => Placement {
                parent: parent.clone(),
                index: self.arena.child_ids(parent).len(),
            },
        };
        if placement.parent.is_root() && !self.allow_root {
            return Err(TreeError::RootNotAllowed {
                context: RootContext::Create,
            });
        }
        Ok(placement)
    }
}

fn sibling_index(siblings: &[NodeId], id: &NodeId) -> TreeResult<usize> {
    siblings
        .iter()
        .position(|s| s == id)
        .ok_or_else(|| TreeError::validation(format!("{id} missing from sibling list")))
}

/// Check the user-supplied fields of a create or update.
pub fn validate_fields(name: &str, kind: &NodeKind, types: &KindIcons) -> TreeResult<()> {
    if name.trim().is_empty() {
        return Err(TreeError::validation("name must not be empty"));
    }
    if !types.is_empty() && !types.contains_key(kind) {
        return Err(TreeError::validation(format!("unknown node kind: {kind}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::ChildRecord;
    use rstest::{fixture, rstest};

    /// a ── b ── c
    /// │    └─── d
    /// └─── e
    /// f
    #[fixture]
    fn arena() -> TreeArena {
        let mut arena = TreeArena::new();
        arena
            .replace_children(
                &Target::Root,
                vec![ChildRecord::new("a", "a").with_children(), ChildRecord::new("f", "f")],
            )
            .unwrap();
        arena
            .replace_children(
                &Target::node("a"),
                vec![ChildRecord::new("b", "b").with_children(), ChildRecord::new("e", "e")],
            )
            .unwrap();
        arena
            .replace_children(
                &Target::node("b"),
                vec![ChildRecord::new("c", "c"), ChildRecord::new("d", "d")],
            )
            .unwrap();
        arena
    }

    #[rstest]
    #[case("a", "a", Position::Into)]
    #[case("a", "b", Position::Into)]
    #[case("a", "d", Position::After)]
    #[case("b", "c", Position::Before)]
    fn given_target_in_own_subtree_when_validating_then_descendant_violation(
        arena: TreeArena,
        #[case] source: &str,
        #[case] target: &str,
        #[case] position: Position,
    ) {
        let result = MoveValidator::new(&arena, true).validate_move(
            &source.into(),
            &Target::node(target),
            position,
        );
        assert!(matches!(result, Err(TreeError::DescendantViolation { .. })));
    }

    #[rstest]
    fn given_root_disabled_when_moving_into_root_then_root_not_allowed(arena: TreeArena) {
        let validator = MoveValidator::new(&arena, false);

        let into_root = validator.validate_move(&"c".into(), &Target::Root, Position::Into);
        let beside_root_node = validator.validate_move(&"c".into(), &Target::node("f"), Position::After);

        assert_eq!(
            into_root,
            Err(TreeError::RootNotAllowed {
                context: RootContext::Move
            })
        );
        assert!(matches!(beside_root_node, Err(TreeError::RootNotAllowed { .. })));
    }

    #[rstest]
    fn given_descendant_and_root_disabled_when_validating_then_descendant_wins(arena: TreeArena) {
        let result = MoveValidator::new(&arena, false).validate_move(
            &"a".into(),
            &Target::node("c"),
            Position::Into,
        );
        assert!(matches!(result, Err(TreeError::DescendantViolation { .. })));
    }

    #[rstest]
    fn given_sibling_reorder_when_validating_then_index_excludes_source(arena: TreeArena) {
        let plan = MoveValidator::new(&arena, true)
            .validate_move(&"c".into(), &Target::node("d"), Position::After)
            .unwrap();

        assert_eq!(plan.old_parent, Target::node("b"));
        assert_eq!(plan.new_parent, Target::node("b"));
        assert_eq!(plan.index, 1);
    }

    #[rstest]
    fn given_move_into_node_when_validating_then_appends(arena: TreeArena) {
        let plan = MoveValidator::new(&arena, true)
            .validate_move(&"f".into(), &Target::node("b"), Position::Into)
            .unwrap();

        assert_eq!(plan.old_parent, Target::Root);
        assert_eq!(plan.new_parent, Target::node("b"));
        assert_eq!(plan.index, 2);
    }

    #[rstest]
    fn given_unknown_source_when_validating_then_validation_error(arena: TreeArena) {
        let result = MoveValidator::new(&arena, true).validate_move(
            &"zz".into(),
            &Target::node("a"),
            Position::Into,
        );
        assert!(matches!(result, Err(TreeError::Validation(_))));
    }

    #[rstest]
    #[case(CreateAction::CreateBefore, "e", Target::node("a"), 1)]
    #[case(CreateAction::CreateAfter, "e", Target::node("a"), 2)]
    #[case(CreateAction::CreateFirstChild, "b", Target::node("b"), 0)]
    #[case(CreateAction::CreateLastChild, "b", Target::node("b"), 2)]
    fn given_anchor_when_placing_create_then_parent_and_index(
        arena: TreeArena,
        #[case] action: CreateAction,
        #[case] anchor: &str,
        #[case] parent: Target,
        #[case] index: usize,
    ) {
        let placement = MoveValidator::new(&arena, true)
            .place_create(action, &Target::node(anchor))
            .unwrap();
        assert_eq!(placement, Placement { parent, index });
    }

    #[rstest]
    fn given_root_disabled_when_creating_beside_root_node_then_root_not_allowed(arena: TreeArena) {
        let result = MoveValidator::new(&arena, false)
            .place_create(CreateAction::CreateAfter, &Target::node("f"));
        assert_eq!(
            result,
            Err(TreeError::RootNotAllowed {
                context: RootContext::Create
            })
        );
    }

    #[test]
    fn given_blank_name_when_validating_fields_then_rejected() {
        let types = KindIcons::new();
        assert!(validate_fields("  ", &NodeKind::default(), &types).is_err());
        assert!(validate_fields("ok", &NodeKind::default(), &types).is_ok());
    }

    #[test]
    fn given_types_map_when_kind_unknown_then_rejected() {
        let mut types = KindIcons::new();
        types.insert(NodeKind::folder(), "📁".to_string());
        assert!(validate_fields("x", &NodeKind::new("file"), &types).is_err());
        assert!(validate_fields("x", &NodeKind::folder(), &types).is_ok());
    }
}
