//! # Dependency resolution.
//!
//! [`resolve`] turns the declared descriptors into a start order where every
//! dependency precedes its dependents.
//!
//! ## Algorithm
//! ```text
//! for each descriptor D in declaration order:
//!     visit(D):
//!         Done      → return
//!         Visiting  → cycle (members = path from D back to D)
//!         otherwise → mark Visiting, visit(dep) for each dep in declared order,
//!                     mark Done, emit D
//! ```
//!
//! Depth-first post-order keeps independent descriptors in their order of first
//! mention (either declared directly or as someone's dependency), so the output
//! is stable and reproducible.
//!
//! ## Rules
//! - Every dependency must name a declared descriptor ([`DeclarationError::MissingDependency`]).
//! - The graph must be acyclic ([`DeclarationError::DependencyCycle`]).
//! - Names must be unique ([`DeclarationError::DuplicateTask`]).
//! - Pure: the same input always yields the same output.

use std::collections::HashMap;

use crate::error::DeclarationError;
use crate::tasks::TaskDescriptor;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
}

struct Walk<'a> {
    declared: &'a [TaskDescriptor],
    index: HashMap<&'a str, usize>,
    marks: Vec<Mark>,
    path: Vec<usize>,
    order: Vec<usize>,
}

impl Walk<'_> {
    fn visit(&mut self, i: usize) -> Result<(), DeclarationError> {
        match self.marks[i] {
            Mark::Done => return Ok(()),
            Mark::Visiting => {
                let start = self.path.iter().position(|&j| j == i).unwrap_or(0);
                let mut members: Vec<String> = self.path[start..]
                    .iter()
                    .map(|&j| self.declared[j].name().to_string())
                    .collect();
                members.push(self.declared[i].name().to_string());
                return Err(DeclarationError::DependencyCycle { members });
            }
            Mark::Unvisited => {}
        }

        self.marks[i] = Mark::Visiting;
        self.path.push(i);

        let declared = self.declared;
        for dep in declared[i].dependencies() {
            // Presence was checked before the walk started.
            if let Some(&j) = self.index.get(dep) {
                self.visit(j)?;
            }
        }

        self.path.pop();
        self.marks[i] = Mark::Done;
        self.order.push(i);
        Ok(())
    }
}

/// Returns `declared` in a dependency-respecting order.
pub fn resolve(declared: &[TaskDescriptor]) -> Result<Vec<TaskDescriptor>, DeclarationError> {
    let mut index = HashMap::with_capacity(declared.len());
    for (i, desc) in declared.iter().enumerate() {
        if index.insert(desc.name(), i).is_some() {
            return Err(DeclarationError::DuplicateTask {
                name: desc.name().to_string(),
            });
        }
    }

    for desc in declared {
        if let Some(missing) = desc.dependencies().find(|d| !index.contains_key(d)) {
            return Err(DeclarationError::MissingDependency {
                task: desc.name().to_string(),
                missing: missing.to_string(),
            });
        }
    }

    let mut walk = Walk {
        declared,
        index,
        marks: vec![Mark::Unvisited; declared.len()],
        path: Vec::new(),
        order: Vec::with_capacity(declared.len()),
    };
    for i in 0..declared.len() {
        walk.visit(i)?;
    }

    Ok(walk.order.into_iter().map(|i| declared[i].clone()).collect())
}
