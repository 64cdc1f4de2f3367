// A fixed set of expensive per-worker resources (path trees, in practice) lent out to tasks that
// run on a thread pool of the same size.
use std::ops::{Deref, DerefMut};
use std::sync::{Condvar, Mutex};

use rayon::prelude::*;

use super::SkimError;


pub struct WorkerPool<R> {
    thread_pool: Option<rayon::ThreadPool>,
    resources: Mutex<Vec<R>>,
    returned: Condvar,
    size: usize,
}

/// Exclusive use of one pooled resource.  The resource goes back to the pool when the lease is
/// dropped, whether the task using it succeeded or not.
pub struct Lease<'a, R> {
    pool: &'a WorkerPool<R>,
    resource: Option<R>,
}

impl<'a, R> Deref for Lease<'a, R> {
    type Target = R;

    fn deref(&self) -> &R {
        // only None while being dropped
        self.resource.as_ref().expect("lease used after release")
    }
}

impl<'a, R> DerefMut for Lease<'a, R> {
    fn deref_mut(&mut self) -> &mut R {
        self.resource.as_mut().expect("lease used after release")
    }
}

impl<'a, R> Drop for Lease<'a, R> {
    fn drop(&mut self) {
        if let Some(resource) = self.resource.take() {
            let mut resources = self.pool.resources.lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            resources.push(resource);
            self.pool.returned.notify_one();
        }
    }
}

impl<R: Send> WorkerPool<R> {
    /// A pool lending out `resources`, with one thread per resource.
    pub fn new(resources: Vec<R>) -> Result<WorkerPool<R>, SkimError> {
        let size = resources.len();
        if size == 0 {
            return Err(SkimError::EmptyPool);
        }
        let thread_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(size)
            .thread_name(|ii| format!("skim-worker-{}", ii))
            .build()?;
        log::debug!("started a worker pool with {} threads", size);
        Ok(WorkerPool {
            thread_pool: Some(thread_pool),
            resources: Mutex::new(resources),
            returned: Condvar::new(),
            size,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_shut_down(&self) -> bool {
        self.thread_pool.is_none()
    }

    /// Resources not currently lent out.
    pub fn num_available(&self) -> usize {
        self.resources.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }

    /// Takes a resource out of the pool, waiting until one is returned if all are in use.
    pub fn checkout(&self) -> Result<Lease<'_, R>, SkimError> {
        if self.is_shut_down() {
            return Err(SkimError::PoolShutDown);
        }
        let mut resources = self.resources.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        loop {
            if let Some(resource) = resources.pop() {
                return Ok(Lease {pool: self, resource: Some(resource)});
            }
            resources = self.returned.wait(resources)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }

    /// Runs `task` once for every item, in parallel on the pool's threads, each time with
    /// exclusive use of one of the pooled resources.  Returns once every task has finished, or
    /// with the error of a failed task.
    pub fn submit_and_wait<T, F>(&self, items: Vec<T>, task: F) -> Result<(), SkimError>
        where T: Send,
              F: Fn(&mut R, T) -> Result<(), SkimError> + Sync
    {
        let thread_pool = match &self.thread_pool {
            Some(thread_pool) => thread_pool,
            None => return Err(SkimError::PoolShutDown),
        };
        thread_pool.install(|| {
            items.into_par_iter().try_for_each(|item| {
                let mut lease = self.checkout()?;
                task(&mut lease, item)
            })
        })
    }

    /// Stops the threads and drops the pooled resources.  Later submissions fail.
    pub fn shutdown(&mut self) {
        self.thread_pool = None;
        self.resources.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clear();
        log::debug!("shut down a worker pool of {} threads", self.size);
    }
}
