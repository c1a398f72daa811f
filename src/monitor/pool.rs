use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::log_plain;

const SOURCE: &'static str = "pool";

type Task = Box<dyn FnOnce() + Send + 'static>;

pub struct WorkerPool {
    sender: Mutex<Option<Sender<Task>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

pub struct TaskHandle<T> {
    rx: Receiver<T>,
}

impl<T> TaskHandle<T> {
    pub fn wait(&self, timeout: Duration) -> Result<Option<T>> {
        match self.rx.recv_timeout(timeout) {
            Ok(value) => Ok(Some(value)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(Error::TaskLost),
        }
    }
}

fn worker_loop(queue: Arc<Mutex<Receiver<Task>>>) {
    loop {
        let task = {
            let rx = queue.lock().unwrap();
            match rx.recv() {
                Ok(task) => task,
                Err(_) => return,
            }
        };

        if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
            log_plain!(Error, SOURCE, "Worker task panicked");
        }
    }
}

impl WorkerPool {
    pub fn start(threads: usize) -> Result<WorkerPool> {
        let (tx, rx) = mpsc::channel::<Task>();
        let queue = Arc::new(Mutex::new(rx));

        let mut workers = Vec::with_capacity(threads);
        for n in 0..threads.max(1) {
            let queue = queue.clone();
            let handle = thread::Builder::new()
                .name(format!("dfu-monitor-{}", n))
                .spawn(move || worker_loop(queue))?;
            workers.push(handle);
        }

        Ok(WorkerPool {
            sender: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
        })
    }

    pub fn submit<T, F>(&self, f: F) -> Result<TaskHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let task: Task = Box::new(move || {
            /* Nobody may be waiting anymore, e.g. after a caller side timeout */
            let _ = tx.send(f());
        });

        let sender = self.sender.lock().unwrap();
        match sender.as_ref() {
            Some(s) => s.send(task).map_err(|_| Error::PoolShutDown)?,
            None => return Err(Error::PoolShutDown),
        }

        Ok(TaskHandle { rx })
    }

    pub fn is_running(&self) -> bool {
        self.sender.lock().unwrap().is_some()
    }

    /* Blocks until running tasks end, cancel them first */
    pub fn shutdown(&self) {
        let sender = self.sender.lock().unwrap().take();
        drop(sender);

        let workers: Vec<JoinHandle<()>> = self.workers.lock().unwrap().drain(..).collect();
        for worker in workers {
            if worker.join().is_err() {
                log_plain!(Error, SOURCE, "Worker thread ended abnormally");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
