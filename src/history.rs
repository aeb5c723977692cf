//! history.rs: bounded chat transcript used as prompt context.
//!
//! The persona is not stored here; it is always prepended by the caller.
//! Only user/assistant turns are kept, oldest evicted first.

use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

#[derive(Debug)]
pub struct ChatHistory {
    inner: Mutex<VecDeque<ChatTurn>>,
    cap: usize,
}

impl ChatHistory {
    pub fn with_capacity(cap: usize) -> Self {
        let cap = cap.clamp(1, 10_000);
        Self {
            inner: Mutex::new(VecDeque::with_capacity(cap)),
            cap,
        }
    }

    pub fn push(&self, role: Role, content: impl Into<String>) {
        let mut v = self.inner.lock().expect("history mutex poisoned");
        v.push_back(ChatTurn {
            role,
            content: content.into(),
        });
        while v.len() > self.cap {
            v.pop_front();
        }
    }

    pub fn snapshot(&self) -> Vec<ChatTurn> {
        let v = self.inner.lock().expect("history mutex poisoned");
        v.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("history mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_from_front_past_capacity() {
        let h = ChatHistory::with_capacity(3);
        for i in 0..5 {
            h.push(Role::User, format!("m{i}"));
        }
        let snap = h.snapshot();
        assert_eq!(snap.len(), 3);
        assert_eq!(snap[0].content, "m2");
        assert_eq!(snap[2].content, "m4");
    }

    #[test]
    fn zero_capacity_keeps_latest_turn() {
        let h = ChatHistory::with_capacity(0);
        h.push(Role::User, "a");
        h.push(Role::Assistant, "b");
        assert_eq!(h.capacity(), 1);
        assert_eq!(h.snapshot()[0].role, Role::Assistant);
    }
}
