use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use crate::error::{Error, Result};

#[derive(Clone, Default)]
pub struct StopSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl StopSignal {
    pub fn new() -> StopSignal {
        StopSignal::default()
    }

    pub fn raise(&self) {
        let (lock, cvar) = &*self.inner;
        *lock.lock().unwrap() = true;
        cvar.notify_all();
    }

    pub fn is_raised(&self) -> bool {
        let (lock, _) = &*self.inner;
        *lock.lock().unwrap()
    }

    pub fn sleep(&self, wait: Duration) -> Result<()> {
        let (lock, cvar) = &*self.inner;
        let guard = lock.lock().unwrap();
        let (raised, _) = cvar.wait_timeout_while(guard, wait, |raised| !*raised).unwrap();
        match *raised {
            true => Err(Error::Interrupted),
            false => Ok(()),
        }
    }
}
