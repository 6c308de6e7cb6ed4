//! Multi-target concatenation
//!
//! [`Concat`] flattens an ordered list of targets into one stream. Targets
//! are activated only when the previous one is exhausted, and the previous
//! stream is dropped before the next one is opened, so at most one target's
//! resources are held at a time.
//!
//! The first error ends the stream: it is yielded once and every later call
//! returns `None`.

/// Lazily concatenated streams of fallible items
pub struct Concat<I, F, S> {
    targets: I,
    activate: F,
    current: Option<S>,
    halted: bool,
}

impl<I, F, S> Concat<I, F, S> {
    /// Concatenate the streams produced by `activate` for each target.
    ///
    /// `activate` returns `Ok(None)` to skip a target without opening it.
    pub fn new(targets: I, activate: F) -> Self {
        Self {
            targets,
            activate,
            current: None,
            halted: false,
        }
    }

    fn halt(&mut self) {
        self.current = None;
        self.halted = true;
    }
}

impl<I, F, S, T, E> Iterator for Concat<I, F, S>
where
    I: Iterator,
    F: FnMut(I::Item) -> Result<Option<S>, E>,
    S: Iterator<Item = Result<T, E>>,
{
    type Item = Result<T, E>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.halted {
            return None;
        }

        loop {
            if let Some(stream) = self.current.as_mut() {
                match stream.next() {
                    Some(Ok(item)) => return Some(Ok(item)),
                    Some(Err(e)) => {
                        self.halt();
                        return Some(Err(e));
                    }
                    None => self.current = None,
                }
            }

            let Some(target) = self.targets.next() else {
                self.halted = true;
                return None;
            };
            match (self.activate)(target) {
                Ok(Some(stream)) => self.current = Some(stream),
                Ok(None) => {}
                Err(e) => {
                    self.halt();
                    return Some(Err(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Stream = std::vec::IntoIter<Result<u32, String>>;

    fn stream(items: &[u32]) -> Stream {
        items.iter().map(|&i| Ok(i)).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn test_preserves_target_order() {
        let targets = vec![vec![1, 2], vec![], vec![3]];
        let concat = Concat::new(targets.into_iter(), |t: Vec<u32>| {
            Ok::<_, String>(Some(stream(&t)))
        });
        let items: Vec<u32> = concat.map(Result::unwrap).collect();
        assert_eq!(items, vec![1, 2, 3]);
    }

    #[test]
    fn test_targets_activated_lazily() {
        let opened = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&opened);
        let mut concat = Concat::new(vec!["a", "b"].into_iter(), move |t: &'static str| {
            log.borrow_mut().push(t);
            Ok::<_, String>(Some(stream(&[1, 2])))
        });

        assert!(opened.borrow().is_empty());
        concat.next();
        assert_eq!(*opened.borrow(), vec!["a"]);
        concat.next();
        assert_eq!(*opened.borrow(), vec!["a"]);
        concat.next();
        assert_eq!(*opened.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn test_skipped_targets_are_not_opened() {
        let concat = Concat::new(vec![0, 1, 2].into_iter(), |t: u32| {
            if t == 1 {
                Ok::<_, String>(None)
            } else {
                Ok(Some(stream(&[t])))
            }
        });
        let items: Vec<u32> = concat.map(Result::unwrap).collect();
        assert_eq!(items, vec![0, 2]);
    }

    #[test]
    fn test_first_error_halts() {
        let targets = vec![
            vec![Ok(1), Err("bad".to_string()), Ok(2)],
            vec![Ok(3)],
        ];
        let concat = Concat::new(targets.into_iter(), |t: Vec<Result<u32, String>>| {
            Ok::<_, String>(Some(t.into_iter()))
        });
        let items: Vec<Result<u32, String>> = concat.collect();
        assert_eq!(items, vec![Ok(1), Err("bad".to_string())]);
    }

    #[test]
    fn test_activation_error_halts() {
        let mut concat = Concat::new(vec![0, 1].into_iter(), |t: u32| {
            if t == 0 {
                Err("cannot open".to_string())
            } else {
                Ok(Some(stream(&[t])))
            }
        });
        assert_eq!(concat.next(), Some(Err("cannot open".to_string())));
        assert_eq!(concat.next(), None);
    }
}
