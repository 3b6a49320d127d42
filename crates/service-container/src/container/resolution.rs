//! Cache state and the in-progress resolution stack.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::service::Service;
use crate::{Error, Result};

#[derive(Default)]
pub(super) struct State {
    pub(super) services: HashMap<String, Service>,
    /// Names currently being resolved, outermost first.
    resolving: Vec<String>,
    pub(super) resolutions: u64,
    pub(super) misses: u64,
}

/// Marks a name as being resolved for as long as the frame lives.
///
/// Entering a name that is already on the stack is a dependency cycle.
pub(super) struct ResolutionFrame<'a> {
    state: &'a RefCell<State>,
}

impl<'a> ResolutionFrame<'a> {
    pub(super) fn enter(state: &'a RefCell<State>, name: &str) -> Result<Self> {
        let mut current = state.borrow_mut();
        if let Some(start) = current.resolving.iter().position(|n| n == name) {
            let mut chain: Vec<&str> = current.resolving[start..]
                .iter()
                .map(String::as_str)
                .collect();
            chain.push(name);
            return Err(Error::CircularDependency {
                chain: chain.join(" -> "),
            });
        }
        current.resolving.push(name.to_string());
        Ok(Self { state })
    }
}

impl Drop for ResolutionFrame<'_> {
    fn drop(&mut self) {
        self.state.borrow_mut().resolving.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_frames_unwind() {
        let state = RefCell::new(State::default());
        {
            let _outer = ResolutionFrame::enter(&state, "a").unwrap();
            {
                let _inner = ResolutionFrame::enter(&state, "b").unwrap();
                assert_eq!(state.borrow().resolving, vec!["a", "b"]);
            }
            assert_eq!(state.borrow().resolving, vec!["a"]);
        }
        assert!(state.borrow().resolving.is_empty());
    }

    #[test]
    fn test_reentering_reports_chain() {
        let state = RefCell::new(State::default());
        let _x = ResolutionFrame::enter(&state, "x").unwrap();
        let _a = ResolutionFrame::enter(&state, "a").unwrap();
        let _b = ResolutionFrame::enter(&state, "b").unwrap();

        let err = ResolutionFrame::enter(&state, "a").err().unwrap();
        match err {
            Error::CircularDependency { chain } => assert_eq!(chain, "a -> b -> a"),
            other => panic!("unexpected error: {other}"),
        }
        // The failed attempt leaves the stack untouched.
        assert_eq!(state.borrow().resolving.len(), 3);
    }
}
