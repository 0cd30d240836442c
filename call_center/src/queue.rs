use std::collections::VecDeque;

/// FIFO of call ids waiting for an agent, in arrival order
#[derive(Debug, Clone, Default)]
pub struct WaitingQueue {
    calls: VecDeque<usize>,
}

impl WaitingQueue {
    pub fn new() -> Self {
        WaitingQueue {
            calls: VecDeque::new(),
        }
    }

    pub fn push_back(&mut self, call_id: usize) {
        self.calls.push_back(call_id);
    }

    pub fn front(&self) -> Option<usize> {
        self.calls.front().copied()
    }

    pub fn pop_front(&mut self) -> Option<usize> {
        self.calls.pop_front()
    }

    /// Take a call out of the middle of the line; false if it was not waiting
    pub fn remove(&mut self, call_id: usize) -> bool {
        match self.calls.iter().position(|&id| id == call_id) {
            Some(index) => {
                self.calls.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, call_id: usize) -> bool {
        self.calls.contains(&call_id)
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}
