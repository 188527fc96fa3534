use std::mem;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::Promise;

/// Combines independent promises into one that completes once all of them have.
///
/// The combined value lists the inputs' values in input order. If any input
/// failed, the combined promise fails with the error of the first failed input
/// in input order, but only after every input has completed.
///
/// An empty input completes the combined promise before this function returns,
/// so observers registered on it run immediately.
pub fn when<T, E, I>(promises: I) -> Promise<Vec<T>, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    I: IntoIterator<Item = Promise<T, E>>,
{
    let promises: Vec<_> = promises.into_iter().collect();
    let combined = Promise::new();

    if promises.is_empty() {
        combined.succeed(Vec::new());
        return combined;
    }

    let slots: Arc<Mutex<Vec<Option<Result<T, E>>>>> =
        Arc::new(Mutex::new((0..promises.len()).map(|_| None).collect()));
    let outstanding = Arc::new(AtomicUsize::new(promises.len()));

    for (index, promise) in promises.into_iter().enumerate() {
        let slots = Arc::clone(&slots);
        let outstanding = Arc::clone(&outstanding);
        let combined = combined.clone();

        promise.on_complete(move |result| {
            slots.lock()[index] = Some(result.clone());

            if outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
                let results = mem::take(&mut *slots.lock());
                combined.complete(results.into_iter().flatten().collect());
            }
        });
    }

    combined
}

impl<T, E> Promise<Vec<T>, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// See [`when`].
    pub fn when<I>(promises: I) -> Self
    where
        I: IntoIterator<Item = Promise<T, E>>,
    {
        when(promises)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::thread;

    #[test]
    fn test_empty_list_completes_synchronously() {
        let complete = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&complete);

        when(Vec::<Promise<(), String>>::new()).then_always(move || {
            flag.store(true, Ordering::SeqCst);
        });

        assert!(complete.load(Ordering::SeqCst));
    }

    #[test]
    fn test_waits_for_every_input_and_keeps_order() {
        let a = Promise::<u32, String>::new();
        let b = Promise::<u32, String>::new();
        let c = Promise::<u32, String>::new();
        let combined = Promise::when([a.clone(), b.clone(), c.clone()]);

        c.succeed(3);
        a.succeed(1);
        assert!(!combined.is_done());

        b.succeed(2);
        assert_eq!(combined.try_result(), Some(Ok(vec![1, 2, 3])));
    }

    #[test]
    fn test_failure_reported_only_after_all_complete() {
        let a = Promise::<u32, String>::new();
        let b = Promise::<u32, String>::new();
        let c = Promise::<u32, String>::new();
        let combined = when(vec![a.clone(), b.clone(), c.clone()]);

        c.fail("third".into());
        b.fail("second".into());
        assert!(!combined.is_done());

        a.succeed(1);
        assert_eq!(combined.try_result(), Some(Err("second".into())));
    }

    #[test]
    fn test_completes_from_the_last_completing_thread() {
        let inputs: Vec<_> = (0..16).map(|_| Promise::<usize, String>::new()).collect();
        let combined = when(inputs.clone());

        let handles: Vec<_> = inputs
            .into_iter()
            .enumerate()
            .map(|(i, p)| thread::spawn(move || p.succeed(i)))
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(combined.try_result(), Some(Ok((0..16).collect())));
    }
}
