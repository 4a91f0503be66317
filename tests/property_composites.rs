// tests/property_composites.rs

mod common;
use crate::common::FakeExecutor;
use crate::common::builders::TaskConfigBuilder;

use std::collections::HashSet;
use std::sync::Arc;

use proptest::prelude::*;

use sitepipe::config::ProjectSection;
use sitepipe::exec::Task;
use sitepipe::fs::{FileSystem, RealFileSystem};
use sitepipe::graph::{Node, Runner};
use sitepipe::output::OutputLayout;

/// A composite tree shape; leaves become uniquely named tasks.
#[derive(Debug, Clone)]
enum Shape {
    Leaf,
    Seq(Vec<Shape>),
    Par(Vec<Shape>),
}

fn shape_strategy() -> impl Strategy<Value = Shape> {
    Just(Shape::Leaf).prop_recursive(4, 24, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Shape::Seq),
            proptest::collection::vec(inner, 0..4).prop_map(Shape::Par),
        ]
    })
}

fn build(shape: &Shape, next: &mut usize, leaves: &mut Vec<String>) -> Node {
    match shape {
        Shape::Leaf => {
            let name = format!("t{next}");
            *next += 1;
            leaves.push(name.clone());
            let cfg = TaskConfigBuilder::copy(&format!("app/{name}/*"), "dist").build();
            Node::task(Task::from_config(&name, &cfg).unwrap())
        }
        Shape::Seq(children) => {
            Node::sequential(children.iter().map(|c| build(c, next, leaves)).collect())
        }
        Shape::Par(children) => {
            Node::concurrent(children.iter().map(|c| build(c, next, leaves)).collect())
        }
    }
}

/// Leaves a correct runner must have started: sequences stop after a
/// failing child; concurrent groups start every child.
fn must_run(node: &Node, failing: &HashSet<String>, out: &mut HashSet<String>) -> bool {
    match node {
        Node::Clean => true,
        Node::Task(task) => {
            out.insert(task.name.clone());
            !failing.contains(&task.name)
        }
        Node::Sequential { children, .. } => {
            for child in children {
                if !must_run(child, failing, out) {
                    return false;
                }
            }
            true
        }
        Node::Concurrent { children, .. } => {
            let mut ok = true;
            for child in children {
                ok &= must_run(child, failing, out);
            }
            ok
        }
    }
}

fn run(node: &Node, exec: &FakeExecutor) -> bool {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let layout = Arc::new(OutputLayout::from_config(
        std::path::Path::new("does-not-exist"),
        &ProjectSection::default(),
    ));
    let runner = Runner::new(Arc::new(exec.clone()), fs, layout);

    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap()
        .block_on(runner.run(node))
        .is_ok()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn composites_run_exactly_the_reachable_tasks(
        shape in shape_strategy(),
        fail_mask in proptest::collection::vec(any::<bool>(), 32),
    ) {
        let mut next = 0;
        let mut leaves = Vec::new();
        let node = build(&shape, &mut next, &mut leaves);

        let failing: HashSet<String> = leaves
            .iter()
            .enumerate()
            .filter(|(i, _)| fail_mask[i % fail_mask.len()])
            .map(|(_, name)| name.clone())
            .collect();

        let mut exec = FakeExecutor::new();
        for name in &failing {
            exec = exec.fail_on(name);
        }

        let mut expected = HashSet::new();
        let expected_ok = must_run(&node, &failing, &mut expected);

        let ok = run(&node, &exec);
        let executed = exec.executed();
        let executed_set: HashSet<String> = executed.iter().cloned().collect();

        prop_assert_eq!(ok, expected_ok);
        prop_assert_eq!(executed.len(), executed_set.len(), "a task ran twice");
        prop_assert_eq!(executed_set, expected);
    }

    #[test]
    fn pure_sequences_preserve_declared_order(len in 0usize..8, fail_at in proptest::option::of(0usize..8)) {
        let mut next = 0;
        let mut leaves = Vec::new();
        let shape = Shape::Seq(vec![Shape::Leaf; len]);
        let node = build(&shape, &mut next, &mut leaves);

        let mut exec = FakeExecutor::new();
        if let Some(i) = fail_at.filter(|i| *i < len) {
            exec = exec.fail_on(&leaves[i]);
        }

        let ok = run(&node, &exec);
        let stop = fail_at.filter(|i| *i < len).map(|i| i + 1).unwrap_or(len);

        prop_assert_eq!(ok, fail_at.is_none_or(|i| i >= len));
        prop_assert_eq!(exec.executed(), leaves[..stop].to_vec());
    }
}
