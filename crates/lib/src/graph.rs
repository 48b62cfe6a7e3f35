//! Build-step DAG and deterministic step ordering.
//!
//! Steps are added in declaration order. Edges come from two places:
//! - explicit predecessors named in a step's `after` list
//! - implicit producers: a step that consumes an artifact another step
//!   outputs depends on that producer
//!
//! Inputs produced by no step are external inputs. The ordering is a
//! topological sort where, among steps that are ready at the same time, the
//! earliest-declared step goes first. The same manifest therefore always
//! yields the same plan.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap};
use std::fmt;

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
  #[error("dependency cycle detected involving step '{0}'")]
  CycleDetected(String),

  #[error("step '{0}' declared more than once")]
  DuplicateStep(String),

  #[error("step '{step}' runs after unknown step '{missing}'")]
  UnknownStep { step: String, missing: String },

  #[error("artifact '{artifact}' is produced by both '{first}' and '{second}'")]
  DuplicateOutput {
    artifact: String,
    first: String,
    second: String,
  },
}

/// Reference to an artifact consumed or produced by a step.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactRef(pub String);

impl fmt::Display for ArtifactRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl ArtifactRef {
  /// Lexically normalize an artifact path.
  ///
  /// Both separators are accepted and `/` is emitted. `.` and empty
  /// components are dropped and `..` cancels the preceding component. A
  /// leading `/` is kept. The filesystem is not consulted, so two refs to
  /// the same file through a symlink still differ.
  pub fn normalized(path: &str) -> Self {
    let absolute = path.starts_with('/') || path.starts_with('\\');
    let mut parts: Vec<&str> = Vec::new();

    for part in path.split(['/', '\\']) {
      match part {
        "" | "." => {}
        ".." => match parts.last() {
          Some(&last) if last != ".." => {
            parts.pop();
          }
          _ if absolute => {}
          _ => parts.push(".."),
        },
        part => parts.push(part),
      }
    }

    let joined = parts.join("/");
    match (absolute, joined.is_empty()) {
      (true, _) => ArtifactRef(format!("/{}", joined)),
      (false, true) => ArtifactRef(".".to_string()),
      (false, false) => ArtifactRef(joined),
    }
  }
}

impl From<&str> for ArtifactRef {
  fn from(value: &str) -> Self {
    ArtifactRef(value.to_string())
  }
}

/// One step of the build pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStep {
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(default)]
  pub inputs: BTreeSet<ArtifactRef>,
  #[serde(default)]
  pub outputs: BTreeSet<ArtifactRef>,
  /// Explicit predecessor step names.
  #[serde(default)]
  pub after: Vec<String>,
  /// Command handed to the external executor.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub run: Option<String>,
}

impl BuildStep {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      ..Default::default()
    }
  }

  pub fn after(mut self, step: impl Into<String>) -> Self {
    self.after.push(step.into());
    self
  }

  pub fn input(mut self, artifact: impl Into<String>) -> Self {
    self.inputs.insert(ArtifactRef::normalized(&artifact.into()));
    self
  }

  pub fn output(mut self, artifact: impl Into<String>) -> Self {
    self.outputs.insert(ArtifactRef::normalized(&artifact.into()));
    self
  }

  pub fn run(mut self, cmd: impl Into<String>) -> Self {
    self.run = Some(cmd.into());
    self
  }
}

/// A step placed in the final order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedStep {
  #[serde(flatten)]
  pub step: BuildStep,
  /// All direct predecessors, explicit and implicit, in declaration order.
  pub depends_on: Vec<String>,
  /// Parallel execution level; every predecessor has a lower wave.
  pub wave: usize,
}

/// Collects steps and produces a validated ordering.
#[derive(Debug, Default)]
pub struct TaskGraphBuilder {
  steps: Vec<BuildStep>,
  index: HashMap<String, usize>,
}

impl TaskGraphBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add a step. Fails if a step with the same name was already added.
  pub fn add_step(&mut self, step: BuildStep) -> Result<(), GraphError> {
    if self.index.contains_key(&step.name) {
      return Err(GraphError::DuplicateStep(step.name));
    }
    self.index.insert(step.name.clone(), self.steps.len());
    self.steps.push(step);
    Ok(())
  }

  pub fn len(&self) -> usize {
    self.steps.len()
  }

  pub fn is_empty(&self) -> bool {
    self.steps.is_empty()
  }

  /// Produce the ordered step sequence.
  pub fn build(&self) -> Result<Vec<BuildStep>, GraphError> {
    Ok(self.plan()?.into_iter().map(|p| p.step).collect())
  }

  /// Produce the ordered steps together with dependency and wave data.
  pub fn plan(&self) -> Result<Vec<PlannedStep>, GraphError> {
    let graph = self.graph()?;

    // Node indices equal declaration indices since nodes are added in order.
    let mut in_degree: Vec<usize> = graph
      .node_indices()
      .map(|idx| graph.neighbors_directed(idx, Direction::Incoming).count())
      .collect();
    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
      .iter()
      .enumerate()
      .filter(|&(_, &deg)| deg == 0)
      .map(|(idx, _)| Reverse(idx))
      .collect();

    let mut wave = vec![0usize; self.steps.len()];
    let mut order = Vec::with_capacity(self.steps.len());

    while let Some(Reverse(idx)) = ready.pop() {
      order.push(idx);
      for next in graph.neighbors_directed(NodeIndex::new(idx), Direction::Outgoing) {
        let next = next.index();
        wave[next] = wave[next].max(wave[idx] + 1);
        in_degree[next] -= 1;
        if in_degree[next] == 0 {
          ready.push(Reverse(next));
        }
      }
    }

    let planned = order
      .into_iter()
      .map(|idx| {
        let mut preds: Vec<usize> = graph
          .neighbors_directed(NodeIndex::new(idx), Direction::Incoming)
          .map(NodeIndex::index)
          .collect();
        preds.sort_unstable();

        PlannedStep {
          step: self.steps[idx].clone(),
          depends_on: preds.into_iter().map(|p| self.steps[p].name.clone()).collect(),
          wave: wave[idx],
        }
      })
      .collect();

    Ok(planned)
  }

  /// Build and validate the underlying graph.
  fn graph(&self) -> Result<DiGraph<usize, ()>, GraphError> {
    let mut graph = DiGraph::with_capacity(self.steps.len(), 0);
    for idx in 0..self.steps.len() {
      graph.add_node(idx);
    }

    let mut producers: HashMap<&ArtifactRef, usize> = HashMap::new();
    for (idx, step) in self.steps.iter().enumerate() {
      for output in &step.outputs {
        if let Some(&first) = producers.get(output) {
          return Err(GraphError::DuplicateOutput {
            artifact: output.0.clone(),
            first: self.steps[first].name.clone(),
            second: step.name.clone(),
          });
        }
        producers.insert(output, idx);
      }
    }

    for (idx, step) in self.steps.iter().enumerate() {
      for pred in &step.after {
        let &pred_idx = self.index.get(pred).ok_or_else(|| GraphError::UnknownStep {
          step: step.name.clone(),
          missing: pred.clone(),
        })?;
        graph.update_edge(NodeIndex::new(pred_idx), NodeIndex::new(idx), ());
      }

      for input in &step.inputs {
        match producers.get(input) {
          // A step reading its own output updates it in place.
          Some(&producer) if producer != idx => {
            debug!(step = %step.name, producer = %self.steps[producer].name, artifact = %input, "implicit edge");
            graph.update_edge(NodeIndex::new(producer), NodeIndex::new(idx), ());
          }
          Some(_) => {}
          None => debug!(step = %step.name, artifact = %input, "external input"),
        }
      }
    }

    toposort(&graph, None).map_err(|cycle| GraphError::CycleDetected(self.steps[graph[cycle.node_id()]].name.clone()))?;

    Ok(graph)
  }
}

/// Group planned steps into parallel execution waves, preserving order within a wave.
pub fn waves(steps: &[PlannedStep]) -> Vec<Vec<&PlannedStep>> {
  let max = steps.iter().map(|s| s.wave).max();
  let Some(max) = max else {
    return Vec::new();
  };

  let mut waves: Vec<Vec<&PlannedStep>> = vec![Vec::new(); max + 1];
  for step in steps {
    waves[step.wave].push(step);
  }
  waves.retain(|w| !w.is_empty());
  waves
}
