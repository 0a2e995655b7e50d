//! Story tree flattening
//!
//! Walks a [`ContentNode`] tree in pre-order with an explicit stack, so deep
//! comment threads never grow the call stack.

use crate::config::ParentLinking;
use crate::models::{ContentNode, FlatRecord, ItemId};

/// Pre-order iterator over a story tree
///
/// The root is yielded with no parent. Descendants get a parent according to
/// `linking`: the story root's ID, or the ID of the node directly above them.
pub struct Flatten<'a> {
    root_id: ItemId,
    linking: ParentLinking,
    stack: Vec<(&'a ContentNode, Option<ItemId>)>,
}

pub fn flatten(root: &ContentNode, linking: ParentLinking) -> Flatten<'_> {
    Flatten {
        root_id: root.id,
        linking,
        stack: vec![(root, None)],
    }
}

impl<'a> Iterator for Flatten<'a> {
    type Item = FlatRecord;

    fn next(&mut self) -> Option<FlatRecord> {
        let (node, parent) = self.stack.pop()?;

        let child_parent = match self.linking {
            ParentLinking::StoryRoot => self.root_id,
            ParentLinking::Structural => node.id,
        };
        // reversed so the first child is popped first
        self.stack
            .extend(node.children.iter().rev().map(|child| (child, Some(child_parent))));

        Some(FlatRecord::from_node(node, parent))
    }
}
