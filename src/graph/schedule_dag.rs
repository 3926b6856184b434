use crate::error::{ScheduleError, ScheduleResult};
use crate::task::{RelationType, Task, TaskId};
use petgraph::Direction;
use petgraph::algo::has_path_connecting;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::Bfs;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap};

/// Dependency graph keyed by task id. Edges point predecessor -> successor and
/// are only inserted when they keep the graph acyclic.
#[derive(Debug, Clone, Default)]
pub struct ScheduleDag {
    graph: StableDiGraph<TaskId, RelationType>,
    id_to_index: HashMap<TaskId, NodeIndex>,
}

impl ScheduleDag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(tasks: &BTreeMap<TaskId, Task>) -> ScheduleResult<Self> {
        let mut dag = Self::new();
        for id in tasks.keys() {
            dag.add_task(*id);
        }
        for task in tasks.values() {
            for dep in &task.predecessors {
                dag.add_dependency(dep.predecessor, task.id, dep.relation)?;
            }
        }
        Ok(dag)
    }

    pub fn len(&self) -> usize {
        self.id_to_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_index.is_empty()
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.id_to_index.contains_key(&id)
    }

    pub fn add_task(&mut self, id: TaskId) {
        if !self.id_to_index.contains_key(&id) {
            let ix = self.graph.add_node(id);
            self.id_to_index.insert(id, ix);
        }
    }

    /// Removes the node and every edge touching it.
    pub fn remove_task(&mut self, id: TaskId) -> bool {
        match self.id_to_index.remove(&id) {
            Some(ix) => self.graph.remove_node(ix).is_some(),
            None => false,
        }
    }

    pub fn add_dependency(
        &mut self,
        predecessor: TaskId,
        successor: TaskId,
        relation: RelationType,
    ) -> ScheduleResult<()> {
        if predecessor == successor {
            return Err(ScheduleError::dependency(
                predecessor,
                successor,
                "task cannot depend on itself",
            ));
        }
        let (Some(&u), Some(&v)) = (
            self.id_to_index.get(&predecessor),
            self.id_to_index.get(&successor),
        ) else {
            return Err(ScheduleError::dependency(
                predecessor,
                successor,
                "both tasks must exist",
            ));
        };
        if self.graph.find_edge(u, v).is_some() {
            return Ok(());
        }
        if has_path_connecting(&self.graph, v, u, None) {
            return Err(ScheduleError::dependency(
                predecessor,
                successor,
                "edge would create a cycle",
            ));
        }
        self.graph.add_edge(u, v, relation);
        Ok(())
    }

    pub fn remove_dependency(&mut self, predecessor: TaskId, successor: TaskId) -> bool {
        let (Some(&u), Some(&v)) = (
            self.id_to_index.get(&predecessor),
            self.id_to_index.get(&successor),
        ) else {
            return false;
        };
        match self.graph.find_edge(u, v) {
            Some(edge) => self.graph.remove_edge(edge).is_some(),
            None => false,
        }
    }

    /// Predecessors before successors. Among tasks that are ready at the same
    /// time the smallest id comes first, so the order only depends on the
    /// graph's contents.
    pub fn topological_order(&self) -> ScheduleResult<Vec<TaskId>> {
        self.kahn_order(Direction::Incoming)
    }

    /// Successors before predecessors, again smallest ready id first. Task
    /// `2` is therefore visited before task `3` when both only wait on their
    /// own successors.
    pub fn reverse_topological_order(&self) -> ScheduleResult<Vec<TaskId>> {
        self.kahn_order(Direction::Outgoing)
    }

    /// Kahn's algorithm where a node is ready once every edge in `waits_on`
    /// direction has been emitted.
    fn kahn_order(&self, waits_on: Direction) -> ScheduleResult<Vec<TaskId>> {
        let mut pending: HashMap<NodeIndex, usize> = HashMap::with_capacity(self.len());
        let mut ready = BinaryHeap::new();
        for (&id, &ix) in &self.id_to_index {
            let count = self.graph.neighbors_directed(ix, waits_on).count();
            if count == 0 {
                ready.push(Reverse(id));
            } else {
                pending.insert(ix, count);
            }
        }

        let mut order = Vec::with_capacity(self.len());
        while let Some(Reverse(id)) = ready.pop() {
            order.push(id);
            let Some(&ix) = self.id_to_index.get(&id) else {
                continue;
            };
            for next in self.graph.neighbors_directed(ix, waits_on.opposite()) {
                if let Some(count) = pending.get_mut(&next) {
                    *count -= 1;
                    if *count == 0 {
                        pending.remove(&next);
                        ready.push(Reverse(self.graph[next]));
                    }
                }
            }
        }

        if pending.is_empty() {
            Ok(order)
        } else {
            Err(ScheduleError::NonConvergence {
                unresolved: pending.len(),
            })
        }
    }

    pub fn predecessors(&self, id: TaskId) -> Vec<TaskId> {
        self.neighbors(id, Direction::Incoming)
    }

    pub fn successors(&self, id: TaskId) -> Vec<TaskId> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Every task reachable from `id`, excluding `id` itself.
    pub fn descendants(&self, id: TaskId) -> Vec<TaskId> {
        let Some(&start) = self.id_to_index.get(&id) else {
            return Vec::new();
        };
        let mut bfs = Bfs::new(&self.graph, start);
        let mut found = Vec::new();
        while let Some(ix) = bfs.next(&self.graph) {
            if ix != start {
                found.push(self.graph[ix]);
            }
        }
        found.sort_unstable();
        found
    }

    fn neighbors(&self, id: TaskId, direction: Direction) -> Vec<TaskId> {
        let Some(&ix) = self.id_to_index.get(&id) else {
            return Vec::new();
        };
        let mut ids: Vec<TaskId> = self
            .graph
            .neighbors_directed(ix, direction)
            .map(|n| self.graph[n])
            .collect();
        ids.sort_unstable();
        ids
    }
}
