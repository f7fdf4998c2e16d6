use std::collections::HashSet;

use crate::errors::AuthzError;

enum Step {
    Enter(i32),
    Exit(i32),
}

/// Depth-first walk over a parent relation, driven by the caller.
///
/// `next` yields the node whose parents are needed, the caller answers with
/// `expand`. Every reachable node is yielded once, the root first. A parent
/// that is still on the current path is a cycle.
///
/// Walks resource permission parents as well as group memberships.
pub(crate) struct AncestorWalk {
    stack: Vec<Step>,
    path: Vec<i32>,
    done: HashSet<i32>,
}

impl AncestorWalk {
    pub(crate) fn new(root: i32) -> Self {
        Self {
            stack: vec![Step::Enter(root)],
            path: Vec::new(),
            done: HashSet::new(),
        }
    }

    pub(crate) fn next(&mut self) -> Option<i32> {
        while let Some(step) = self.stack.pop() {
            match step {
                Step::Exit(id) => {
                    self.path.pop();
                    self.done.insert(id);
                }
                Step::Enter(id) if self.done.contains(&id) => continue,
                Step::Enter(id) => return Some(id),
            }
        }
        None
    }

    pub(crate) fn expand(&mut self, id: i32, parents: &[i32]) -> Result<(), AuthzError> {
        self.path.push(id);
        self.stack.push(Step::Exit(id));

        for &parent in parents.iter().rev() {
            if let Some(start) = self.path.iter().position(|&p| p == parent) {
                let mut cycle: Vec<String> =
                    self.path[start..].iter().map(|p| p.to_string()).collect();
                cycle.push(parent.to_string());
                return Err(AuthzError::CycleDetected {
                    path: cycle.join(" -> "),
                });
            }
            if !self.done.contains(&parent) {
                self.stack.push(Step::Enter(parent));
            }
        }
        Ok(())
    }
}
