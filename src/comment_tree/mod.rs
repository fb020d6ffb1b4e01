//! Threaded views over flat comment records.
//!
//! Comments are stored with a parent pointer only. Everything here turns those
//! rows into a forest of [`CommentNode`]s and queries that forest; nothing is
//! cached between requests.

pub mod subtree;

use std::collections::HashMap;

use crate::models::{Comment, CommentNode};

pub use subtree::delete_subtree;

/// Deepest reply accepted on write. Roots sit at depth 0.
pub const MAX_REPLY_DEPTH: usize = 32;

/// Nests flat comments into a forest of reply trees.
///
/// Roots are the comments without a parent, in input order. Replies keep the
/// relative order in which they appear in `comments`. A comment whose parent
/// is not part of `comments` is dropped, together with anything below it.
pub fn nest(comments: &[Comment]) -> Vec<CommentNode> {
    let index: HashMap<i64, usize> = comments
        .iter()
        .enumerate()
        .map(|(slot, comment)| (comment.id, slot))
        .collect();

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); comments.len()];
    let mut roots = Vec::new();
    let mut orphans = 0usize;

    for (slot, comment) in comments.iter().enumerate() {
        match comment.parent_comment_id {
            None => roots.push(slot),
            Some(parent_id) => match index.get(&parent_id) {
                Some(&parent_slot) => children[parent_slot].push(slot),
                None => orphans += 1,
            },
        }
    }

    if orphans > 0 {
        tracing::debug!(orphans, "dropping comments whose parent is missing");
    }

    // Only nodes reachable from a root are built; every reachable node has
    // exactly one parent, so parent-pointer cycles can never be entered.
    build_post_order(
        roots,
        |slot| children[slot].clone(),
        |slot| comments[slot].clone(),
    )
}

enum Visit<K> {
    Enter(K),
    Exit(K, usize),
}

/// Builds a forest bottom-up with an explicit stack, so thread depth never
/// turns into call depth.
///
/// Finished nodes pile up on `done`; leaving a node moves everything its
/// children pushed since it was entered into its `replies`, in order.
fn build_post_order<K: Copy>(
    roots: Vec<K>,
    children: impl Fn(K) -> Vec<K>,
    comment: impl Fn(K) -> Comment,
) -> Vec<CommentNode> {
    let mut stack: Vec<Visit<K>> = roots.into_iter().rev().map(Visit::Enter).collect();
    let mut done: Vec<CommentNode> = Vec::new();

    while let Some(visit) = stack.pop() {
        match visit {
            Visit::Enter(key) => {
                stack.push(Visit::Exit(key, done.len()));
                stack.extend(children(key).into_iter().rev().map(Visit::Enter));
            }
            Visit::Exit(key, first_reply) => {
                let replies = done.split_off(first_reply);
                done.push(CommentNode {
                    comment: comment(key),
                    replies,
                });
            }
        }
    }

    done
}

/// Depth-first search for `target_id`; returns the post that comment belongs to.
pub fn find_owning_post_id(tree: &[CommentNode], target_id: i64) -> Option<i64> {
    locate(tree, target_id).map(|(node, _)| node.comment.post_id)
}

/// Depth of `target_id` in the forest, roots being at 0.
pub fn depth_of(tree: &[CommentNode], target_id: i64) -> Option<usize> {
    locate(tree, target_id).map(|(_, depth)| depth)
}

fn locate(tree: &[CommentNode], target_id: i64) -> Option<(&CommentNode, usize)> {
    let mut stack: Vec<(&CommentNode, usize)> = tree.iter().rev().map(|node| (node, 0)).collect();

    while let Some((node, depth)) = stack.pop() {
        if node.comment.id == target_id {
            return Some((node, depth));
        }
        stack.extend(node.replies.iter().rev().map(|reply| (reply, depth + 1)));
    }
    None
}

/// Keeps only nodes of `post_id`, at every depth.
pub fn filter_by_post(tree: &[CommentNode], post_id: i64) -> Vec<CommentNode> {
    build_post_order(
        matching_post(tree, post_id),
        |node| matching_post(&node.replies, post_id),
        |node| node.comment.clone(),
    )
}

fn matching_post(nodes: &[CommentNode], post_id: i64) -> Vec<&CommentNode> {
    nodes
        .iter()
        .filter(|node| node.comment.post_id == post_id)
        .collect()
}

/// Total number of nodes in the forest, replies included.
pub fn count_nodes(tree: &[CommentNode]) -> usize {
    let mut pending: Vec<&[CommentNode]> = vec![tree];
    let mut total = 0;

    while let Some(nodes) = pending.pop() {
        total += nodes.len();
        pending.extend(nodes.iter().map(|node| node.replies.as_slice()));
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn comment(id: i64, parent: Option<i64>, post_id: i64) -> Comment {
        Comment {
            id,
            post_id,
            author_id: 7,
            content: format!("comment {id}"),
            parent_comment_id: parent,
            created_at: Utc.timestamp_opt(1_700_000_000 + id, 0).unwrap(),
        }
    }

    fn ids(tree: &[CommentNode]) -> Vec<i64> {
        tree.iter().map(|node| node.comment.id).collect()
    }

    fn sample() -> Vec<Comment> {
        vec![
            comment(1, None, 1),
            comment(2, Some(1), 1),
            comment(3, Some(2), 1),
            comment(4, Some(99), 1),
        ]
    }

    #[test]
    fn nests_reply_chain_and_drops_orphan() {
        let tree = nest(&sample());

        assert_eq!(ids(&tree), vec![1]);
        assert_eq!(ids(&tree[0].replies), vec![2]);
        assert_eq!(ids(&tree[0].replies[0].replies), vec![3]);
        assert!(tree[0].replies[0].replies[0].replies.is_empty());
        assert_eq!(count_nodes(&tree), 3);
        assert_eq!(find_owning_post_id(&tree, 4), None);
    }

    #[test]
    fn replies_keep_input_order() {
        let comments = vec![
            comment(10, None, 1),
            comment(13, Some(10), 1),
            comment(11, Some(10), 1),
            comment(12, Some(10), 1),
            comment(20, None, 1),
        ];
        let tree = nest(&comments);

        assert_eq!(ids(&tree), vec![10, 20]);
        assert_eq!(ids(&tree[0].replies), vec![13, 11, 12]);
    }

    #[test]
    fn reply_listed_before_its_parent_is_still_attached() {
        let comments = vec![comment(2, Some(1), 1), comment(1, None, 1)];
        let tree = nest(&comments);

        assert_eq!(ids(&tree), vec![1]);
        assert_eq!(ids(&tree[0].replies), vec![2]);
    }

    #[test]
    fn every_node_holds_exactly_its_children() {
        let comments = vec![
            comment(1, None, 1),
            comment(2, None, 2),
            comment(3, Some(1), 1),
            comment(4, Some(2), 2),
            comment(5, Some(3), 1),
            comment(6, Some(1), 1),
            comment(7, Some(4), 2),
        ];
        let tree = nest(&comments);

        fn check(nodes: &[CommentNode], comments: &[Comment]) {
            for node in nodes {
                let expected: Vec<i64> = comments
                    .iter()
                    .filter(|c| c.parent_comment_id == Some(node.comment.id))
                    .map(|c| c.id)
                    .collect();
                assert_eq!(ids(&node.replies), expected);
                check(&node.replies, comments);
            }
        }

        assert!(tree.iter().all(|n| n.comment.parent_comment_id.is_none()));
        check(&tree, &comments);
        assert_eq!(count_nodes(&tree), comments.len());
    }

    #[test]
    fn parent_cycles_never_surface() {
        let comments = vec![
            comment(1, None, 1),
            comment(2, Some(3), 1),
            comment(3, Some(2), 1),
            comment(4, Some(4), 1),
        ];
        let tree = nest(&comments);

        assert_eq!(ids(&tree), vec![1]);
        assert_eq!(count_nodes(&tree), 1);
    }

    #[test]
    fn nest_is_idempotent_and_leaves_input_alone() {
        let comments = sample();
        let before = comments.clone();

        assert_eq!(nest(&comments), nest(&comments));
        assert_eq!(comments, before);
    }

    #[test]
    fn empty_input_yields_empty_forest() {
        assert!(nest(&[]).is_empty());
        assert_eq!(count_nodes(&[]), 0);
    }

    #[test]
    fn owning_post_found_at_depth() {
        let comments = vec![
            comment(1, None, 5),
            comment(2, Some(1), 5),
            comment(3, Some(2), 5),
            comment(4, Some(3), 5),
            comment(8, None, 6),
        ];
        let tree = nest(&comments);

        assert_eq!(find_owning_post_id(&tree, 4), Some(5));
        assert_eq!(find_owning_post_id(&tree, 8), Some(6));
        assert_eq!(find_owning_post_id(&tree, 42), None);
        assert_eq!(find_owning_post_id(&[], 1), None);
    }

    #[test]
    fn filter_keeps_matching_nodes_at_every_level() {
        // Reply 3 belongs to a different post than its parent.
        let comments = vec![
            comment(1, None, 1),
            comment(2, Some(1), 1),
            comment(3, Some(1), 2),
            comment(4, None, 2),
            comment(5, Some(2), 1),
        ];
        let tree = nest(&comments);

        let only_first = filter_by_post(&tree, 1);
        assert_eq!(ids(&only_first), vec![1]);
        assert_eq!(ids(&only_first[0].replies), vec![2]);
        assert_eq!(ids(&only_first[0].replies[0].replies), vec![5]);

        let only_second = filter_by_post(&tree, 2);
        assert_eq!(ids(&only_second), vec![4]);
        assert!(only_second[0].replies.is_empty());

        assert!(filter_by_post(&tree, 77).is_empty());
        // The source forest is untouched.
        assert_eq!(count_nodes(&tree), 5);
    }

    #[test]
    fn depth_counts_from_the_root() {
        let tree = nest(&sample());

        assert_eq!(depth_of(&tree, 1), Some(0));
        assert_eq!(depth_of(&tree, 3), Some(2));
        assert_eq!(depth_of(&tree, 4), None);
    }

    #[test]
    fn very_long_reply_chain_is_walked_without_recursion() {
        const DEPTH: i64 = 50_000;
        let chain: Vec<Comment> = (1..=DEPTH)
            .map(|id| comment(id, (id > 1).then(|| id - 1), 1 + id % 2))
            .collect();

        let tree = nest(&chain);
        assert_eq!(ids(&tree), vec![1]);
        assert_eq!(count_nodes(&tree), DEPTH as usize);
        assert_eq!(find_owning_post_id(&tree, DEPTH), Some(1 + DEPTH % 2));
        assert_eq!(depth_of(&tree, DEPTH), Some(DEPTH as usize - 1));

        // Post ids alternate down the chain, so only the root survives the cut.
        let filtered = filter_by_post(&tree, 2);
        assert_eq!(ids(&filtered), vec![1]);
        assert_eq!(count_nodes(&filtered), 1);

        let mut shuffled = chain;
        shuffled.reverse();
        let rebuilt = nest(&shuffled);
        assert_eq!(count_nodes(&rebuilt), DEPTH as usize);
        assert!(filter_by_post(&rebuilt, 1).is_empty());
    }

    #[test]
    fn node_serializes_flat_with_replies() {
        let tree = nest(&[comment(1, None, 3), comment(2, Some(1), 3)]);
        let json = serde_json::to_value(&tree[0]).unwrap();

        assert_eq!(json["id"], 1);
        assert_eq!(json["postId"], 3);
        assert!(json["parentCommentId"].is_null());
        assert_eq!(json["replies"][0]["parentCommentId"], 1);
        assert_eq!(json["replies"][0]["replies"], serde_json::json!([]));
    }
}
