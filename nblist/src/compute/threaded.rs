use std::ops::Range;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam::channel::{self, Receiver, Sender};
use log::{debug, warn};

use crate::{Direction, Error, NeighborListManager, NeighborSettings, System, UnitCell, Vector3D};
use crate::lists::AtomLists;
use super::{Computed, Frame, PotentialTable, compute_owned_terms};

/// Data shared by all workers for a single computation
struct Round {
    positions: Vec<Vector3D>,
    types: Vec<usize>,
    cell: UnitCell,
    with_forces: bool,
}

enum Task {
    /// Replace the up lists of the worker, starting at atom `start`
    Lists { start: usize, lists: Vec<AtomLists> },
    /// Compute the terms owned by the worker
    Compute(Arc<Round>),
}

type WorkerResult = (usize, Result<Computed, Error>);

struct Worker {
    tasks: Sender<Task>,
    handle: JoinHandle<()>,
    atoms: Range<usize>,
}

/// A potential master splitting the work between a fixed pool of threads.
///
/// Every worker owns a contiguous range of atoms, and a private copy of
/// their up neighbor lists. The lists are sent to the workers again after
/// each rebuild. Each computation sends the current positions to all
/// workers, waits for all of them to finish, and then sums the partial
/// results in worker order, which makes the results independent of thread
/// scheduling.
pub struct ThreadedPotentialMaster {
    table: Arc<PotentialTable>,
    lists: NeighborListManager,
    workers: Vec<Worker>,
    results: Receiver<WorkerResult>,
    /// rebuild count and number of atoms when the lists were last sent to
    /// the workers
    sent_lists: Option<(usize, usize)>,
}

impl std::fmt::Debug for ThreadedPotentialMaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadedPotentialMaster")
            .field("table", &self.table)
            .field("lists", &self.lists)
            .field("threads", &self.workers.len())
            .finish_non_exhaustive()
    }
}

impl ThreadedPotentialMaster {
    /// Create a new threaded master, with `settings.threads` worker threads.
    /// Only up neighbor lists are built.
    pub fn new(table: PotentialTable, mut settings: NeighborSettings) -> Result<ThreadedPotentialMaster, Error> {
        settings.validate()?;
        let n_threads = settings.threads;
        settings.direction = Direction::Up;

        let mut lists = NeighborListManager::new(settings, table.bonding())?;
        table.configure(&mut lists)?;

        let mut master = ThreadedPotentialMaster {
            table: Arc::new(table),
            lists: lists,
            workers: Vec::new(),
            // placeholder, replaced when starting the workers
            results: channel::never(),
            sent_lists: None,
        };
        master.set_num_threads(n_threads)?;

        return Ok(master);
    }

    pub fn table(&self) -> &PotentialTable {
        &self.table
    }

    pub fn neighbor_lists(&self) -> &NeighborListManager {
        &self.lists
    }

    /// Get mutable access to the neighbor lists, e.g. to notify them of
    /// integrator steps
    pub fn neighbor_lists_mut(&mut self) -> &mut NeighborListManager {
        &mut self.lists
    }

    pub fn num_threads(&self) -> usize {
        self.workers.len()
    }

    /// Range of atoms owned by each worker, as of the last computation
    pub fn worker_atoms(&self) -> Vec<Range<usize>> {
        self.workers.iter().map(|worker| worker.atoms.clone()).collect()
    }

    /// Stop the current workers and start `n_threads` new ones
    pub fn set_num_threads(&mut self, n_threads: usize) -> Result<(), Error> {
        if n_threads < 1 {
            return Err(Error::InvalidParameter(
                "the number of threads must be at least 1".into()
            ));
        }

        self.stop_workers();

        let (results_sender, results) = channel::unbounded();
        for id in 0..n_threads {
            let (tasks, receiver) = channel::bounded(2);
            let table = Arc::clone(&self.table);
            let results_sender = results_sender.clone();

            let handle = std::thread::Builder::new()
                .name(format!("nblist-worker-{}", id))
                .spawn(move || worker_loop(id, &table, &receiver, &results_sender))
                .map_err(|e| Error::Internal(format!("failed to start worker thread: {}", e)))?;

            self.workers.push(Worker { tasks, handle, atoms: 0..0 });
        }

        self.results = results;
        self.sent_lists = None;
        debug!("started {} worker threads", n_threads);

        return Ok(());
    }

    /// Compute the energy, virial and (if `with_forces` is true) forces of
    /// the whole `system`.
    #[time_graph::instrument(name = "ThreadedPotentialMaster::compute")]
    pub fn compute(&mut self, system: &dyn System, with_forces: bool) -> Result<Computed, Error> {
        self.table.check_system(system)?;
        self.lists.update_neighbors_if_needed(system)?;

        let state = (self.lists.rebuild_count(), system.size());
        if self.sent_lists != Some(state) {
            self.fill_neighbor_list_array()?;
            self.sent_lists = Some(state);
        }

        let round = Arc::new(Round {
            positions: system.positions().to_vec(),
            types: system.types().to_vec(),
            cell: system.cell(),
            with_forces: with_forces,
        });

        for worker in &self.workers {
            worker.tasks.send(Task::Compute(Arc::clone(&round))).map_err(|_| disconnected())?;
        }

        let mut partials = Vec::new();
        partials.resize_with(self.workers.len(), || None);
        for _ in 0..self.workers.len() {
            let (id, result) = self.results.recv().map_err(|_| disconnected())?;
            partials[id] = Some(result);
        }

        return write_data(partials, system.size(), with_forces);
    }

    /// Send the up lists of their atoms to all workers
    fn fill_neighbor_list_array(&mut self) -> Result<(), Error> {
        let lists = self.lists.up_lists()?;
        let n_atoms = lists.len();
        let chunk = (n_atoms + self.workers.len() - 1) / self.workers.len();

        for (id, worker) in self.workers.iter_mut().enumerate() {
            let start = usize::min(id * chunk, n_atoms);
            let end = usize::min(start + chunk, n_atoms);
            worker.atoms = start..end;
            worker.tasks.send(Task::Lists {
                start: start,
                lists: lists[start..end].to_vec(),
            }).map_err(|_| disconnected())?;
        }

        debug!("sent neighbor lists of {} atoms to {} workers", n_atoms, self.workers.len());
        return Ok(());
    }

    fn stop_workers(&mut self) {
        for Worker { tasks, handle, .. } in self.workers.drain(..) {
            // closing the channel ends the worker loop
            drop(tasks);
            if handle.join().is_err() {
                warn!("a worker thread panicked outside of a computation");
            }
        }
    }
}

impl Drop for ThreadedPotentialMaster {
    fn drop(&mut self) {
        self.stop_workers();
    }
}

fn worker_loop(id: usize, table: &PotentialTable, tasks: &Receiver<Task>, results: &Sender<WorkerResult>) {
    let mut start = 0;
    let mut lists = Vec::new();

    for task in tasks {
        match task {
            Task::Lists { start: new_start, lists: new_lists } => {
                start = new_start;
                lists = new_lists;
            }
            Task::Compute(round) => {
                let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
                    let frame = Frame::new(&round.positions, &round.types, round.cell);
                    let mut output = Computed::new(round.positions.len(), round.with_forces);
                    compute_owned_terms(table, &frame, &lists, start, &mut output);
                    output
                }));

                if results.send((id, result.map_err(Error::from))).is_err() {
                    return;
                }
            }
        }
    }
}

/// Sum the partial results of all workers, in worker order. If any worker
/// failed, the error of the first one is returned.
fn write_data(partials: Vec<Option<Result<Computed, Error>>>, n_atoms: usize, with_forces: bool) -> Result<Computed, Error> {
    let mut output = Computed::new(n_atoms, with_forces);
    for partial in partials {
        match partial {
            Some(partial) => output.merge(&partial?),
            None => return Err(Error::Internal("missing result from a worker thread".into())),
        }
    }
    return Ok(output);
}

fn disconnected() -> Error {
    Error::Internal("worker threads are no longer running".into())
}
