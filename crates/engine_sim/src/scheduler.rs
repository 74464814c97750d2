//! System scheduler: pipeline ordering and dependency validation.
//!
//! Systems run in one fixed sequence every frame, sorted by depth ascending
//! with registration order breaking ties. A system that lists a component kind
//! as a dependency must run after every system triggered by that kind.
//! Violations are configuration errors reported once, when the pipeline is
//! built.

use std::collections::HashSet;

use engine_component::ComponentTypeId;

use crate::error::SchedulerError;
use crate::system::SystemDescriptor;

/// One scheduled system.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineEntry {
    /// Index into the registry's system list (registration order).
    pub system: usize,
    pub kind: ComponentTypeId,
    pub depth: f32,
}

/// The sorted system pipeline.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    entries: Vec<PipelineEntry>,
}

impl Pipeline {
    /// Sort and validate `systems`. `known` holds every registered component
    /// kind name.
    pub fn build(
        systems: &[SystemDescriptor],
        known: &HashSet<&str>,
    ) -> Result<Self, SchedulerError> {
        for system in systems {
            if !known.contains(system.kind_name) {
                return Err(SchedulerError::UnknownKind {
                    system: system.name.to_string(),
                    kind: system.kind_name.to_string(),
                });
            }
            for dependency in system.dependencies {
                if !known.contains(dependency) {
                    return Err(SchedulerError::UnknownDependency {
                        system: system.name.to_string(),
                        dependency: (*dependency).to_string(),
                    });
                }
            }
        }

        let mut order: Vec<usize> = (0..systems.len()).collect();
        // Stable sort keeps registration order among equal depths.
        order.sort_by(|&a, &b| systems[a].depth.total_cmp(&systems[b].depth));

        let mut position = vec![0; systems.len()];
        for (pos, &index) in order.iter().enumerate() {
            position[index] = pos;
        }

        let edges = dependency_edges(systems);
        if let Some(cycle) = find_cycle(&edges) {
            return Err(SchedulerError::Cycle(
                cycle.iter().map(|&i| systems[i].name.to_string()).collect(),
            ));
        }

        for (index, providers) in edges.iter().enumerate() {
            for &provider in providers {
                if position[provider] > position[index] {
                    return Err(SchedulerError::DependencyOrder {
                        system: systems[index].name.to_string(),
                        depth: systems[index].depth,
                        dependency: systems[provider].name.to_string(),
                        dependency_depth: systems[provider].depth,
                    });
                }
            }
        }

        Ok(Self {
            entries: order
                .into_iter()
                .map(|index| PipelineEntry {
                    system: index,
                    kind: systems[index].kind,
                    depth: systems[index].depth,
                })
                .collect(),
        })
    }

    /// Entries in execution order.
    #[must_use]
    pub fn entries(&self) -> &[PipelineEntry] {
        &self.entries
    }

    /// Entries triggered by `kind`, in execution order.
    pub fn for_kind(&self, kind: ComponentTypeId) -> impl Iterator<Item = &PipelineEntry> {
        self.entries.iter().filter(move |entry| entry.kind == kind)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// For each system, the systems that provide one of its dependencies.
fn dependency_edges(systems: &[SystemDescriptor]) -> Vec<Vec<usize>> {
    systems
        .iter()
        .enumerate()
        .map(|(index, system)| {
            systems
                .iter()
                .enumerate()
                .filter(|(other, provider)| {
                    *other != index && system.dependencies.contains(&provider.kind_name)
                })
                .map(|(other, _)| other)
                .collect()
        })
        .collect()
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    Active,
    Done,
}

/// Depth-first search for a cycle; returns its members in dependency order.
fn find_cycle(edges: &[Vec<usize>]) -> Option<Vec<usize>> {
    fn visit(
        node: usize,
        edges: &[Vec<usize>],
        marks: &mut [Mark],
        stack: &mut Vec<usize>,
    ) -> Option<Vec<usize>> {
        marks[node] = Mark::Active;
        stack.push(node);
        for &next in &edges[node] {
            match marks[next] {
                Mark::Active => {
                    let start = stack.iter().position(|&n| n == next).unwrap_or(0);
                    let mut cycle = stack[start..].to_vec();
                    cycle.push(next);
                    return Some(cycle);
                }
                Mark::Unvisited => {
                    if let Some(cycle) = visit(next, edges, marks, stack) {
                        return Some(cycle);
                    }
                }
                Mark::Done => {}
            }
        }
        stack.pop();
        marks[node] = Mark::Done;
        None
    }

    let mut marks = vec![Mark::Unvisited; edges.len()];
    let mut stack = Vec::new();
    for node in 0..edges.len() {
        if marks[node] == Mark::Unvisited
            && let Some(cycle) = visit(node, edges, &mut marks, &mut stack)
        {
            return Some(cycle);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use engine_component::Category;

    use super::*;

    fn make_system(
        name: &'static str,
        kind: &'static str,
        depth: f32,
        dependencies: &'static [&'static str],
    ) -> SystemDescriptor {
        SystemDescriptor {
            name,
            kind: ComponentTypeId::from_name(kind),
            kind_name: kind,
            category: Category::Core,
            depth,
            dependencies,
        }
    }

    fn known() -> HashSet<&'static str> {
        ["A", "B", "C", "D"].into_iter().collect()
    }

    fn names(systems: &[SystemDescriptor], pipeline: &Pipeline) -> Vec<&'static str> {
        pipeline
            .entries()
            .iter()
            .map(|e| systems[e.system].name)
            .collect()
    }

    #[test]
    fn test_no_systems_empty_pipeline() {
        let pipeline = Pipeline::build(&[], &known()).unwrap();
        assert!(pipeline.is_empty());
    }

    #[test]
    fn test_sorted_by_depth_then_registration() {
        let systems = vec![
            make_system("late", "A", 10.0, &[]),
            make_system("first_tie", "B", 1.0, &[]),
            make_system("early", "C", -1.0, &[]),
            make_system("second_tie", "D", 1.0, &[]),
        ];
        let pipeline = Pipeline::build(&systems, &known()).unwrap();
        assert_eq!(
            names(&systems, &pipeline),
            vec!["early", "first_tie", "second_tie", "late"]
        );
    }

    #[test]
    fn test_dependency_satisfied() {
        let systems = vec![
            make_system("consumer", "B", 5.0, &["A"]),
            make_system("provider", "A", 1.0, &[]),
        ];
        let pipeline = Pipeline::build(&systems, &known()).unwrap();
        assert_eq!(names(&systems, &pipeline), vec!["provider", "consumer"]);
    }

    #[test]
    fn test_equal_depth_dependency_needs_earlier_registration() {
        let ok = vec![
            make_system("provider", "A", 1.0, &[]),
            make_system("consumer", "B", 1.0, &["A"]),
        ];
        assert!(Pipeline::build(&ok, &known()).is_ok());

        let bad = vec![
            make_system("consumer", "B", 1.0, &["A"]),
            make_system("provider", "A", 1.0, &[]),
        ];
        assert!(matches!(
            Pipeline::build(&bad, &known()),
            Err(SchedulerError::DependencyOrder { .. })
        ));
    }

    #[test]
    fn test_dependency_scheduled_later_is_fatal() {
        let systems = vec![
            make_system("consumer", "B", 1.0, &["A"]),
            make_system("provider", "A", 5.0, &[]),
        ];
        let err = Pipeline::build(&systems, &known()).unwrap_err();
        assert_eq!(
            err,
            SchedulerError::DependencyOrder {
                system: "consumer".into(),
                depth: 1.0,
                dependency: "provider".into(),
                dependency_depth: 5.0,
            }
        );
    }

    #[test]
    fn test_unknown_dependency() {
        let systems = vec![make_system("s", "A", 1.0, &["Nope"])];
        assert!(matches!(
            Pipeline::build(&systems, &known()),
            Err(SchedulerError::UnknownDependency { .. })
        ));
        let systems = vec![make_system("s", "Nope", 1.0, &[])];
        assert!(matches!(
            Pipeline::build(&systems, &known()),
            Err(SchedulerError::UnknownKind { .. })
        ));
    }

    #[test]
    fn test_dependency_on_kind_without_system_is_fine() {
        let systems = vec![make_system("s", "A", 1.0, &["D"])];
        assert!(Pipeline::build(&systems, &known()).is_ok());
    }

    #[test]
    fn test_cycle_detected() {
        let systems = vec![
            make_system("a", "A", 1.0, &["C"]),
            make_system("b", "B", 2.0, &["A"]),
            make_system("c", "C", 3.0, &["B"]),
        ];
        match Pipeline::build(&systems, &known()) {
            Err(SchedulerError::Cycle(path)) => {
                assert_eq!(path.first(), path.last());
                assert_eq!(path.len(), 4);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_for_kind() {
        let systems = vec![
            make_system("post", "A", 10.0, &[]),
            make_system("other", "B", 5.0, &[]),
            make_system("pre", "A", 1.0, &[]),
        ];
        let pipeline = Pipeline::build(&systems, &known()).unwrap();
        let a: Vec<usize> = pipeline
            .for_kind(ComponentTypeId::from_name("A"))
            .map(|e| e.system)
            .collect();
        assert_eq!(a, vec![2, 0]);
    }
}
