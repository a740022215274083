//! Scoped acquisition of a closure, run on drop unless cancelled.
//!
//! Grounded on `utility/defer.hpp`. Used wherever the original relies on
//! scope-exit cleanup (closing file handles, releasing git repository
//! handles) without a more specific RAII type already doing the job.

pub struct Defer<F: FnOnce()> {
    f: Option<F>,
}

impl<F: FnOnce()> Defer<F> {
    pub fn new(f: F) -> Self {
        Defer { f: Some(f) }
    }

    pub fn cancel(mut self) {
        self.f = None;
    }
}

impl<F: FnOnce()> Drop for Defer<F> {
    fn drop(&mut self) {
        if let Some(f) = self.f.take() {
            f();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn runs_on_drop() {
        let ran = Cell::new(false);
        {
            let _d = Defer::new(|| ran.set(true));
        }
        assert!(ran.get());
    }

    #[test]
    fn cancel_suppresses() {
        let ran = Cell::new(false);
        {
            let d = Defer::new(|| ran.set(true));
            d.cancel();
        }
        assert!(!ran.get());
    }
}
