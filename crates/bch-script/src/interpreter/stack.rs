//! Script execution stack.
//!
//! Positions are counted from the top: depth 0 is the last pushed item.
//! Every accessor checks the depth against the current size and fails with
//! `InvalidStackOperation`; range checks on script operands (negative
//! indexes and the like) belong to the opcode that read them.

use super::error::{InterpreterError, InterpreterErrorCode};
use super::scriptnum::ScriptNumber;

/// Interpret a stack element as a boolean.
///
/// False is any string of zero bytes, optionally ending in a sign byte
/// (`0x80`), so negative zero is false as well.
pub fn as_bool(t: &[u8]) -> bool {
    match t.split_last() {
        None => false,
        Some((&last, rest)) => rest.iter().any(|&b| b != 0) || (last != 0 && last != 0x80),
    }
}

/// Canonical encoding of a boolean result: `[1]` or the empty string.
pub fn from_bool(v: bool) -> Vec<u8> {
    if v {
        vec![1]
    } else {
        Vec::new()
    }
}

fn underflow(needed: usize, depth: usize) -> InterpreterError {
    InterpreterError::new(
        InterpreterErrorCode::InvalidStackOperation,
        format!("operation needs {} stack items, stack has {}", needed, depth),
    )
}

/// The main or alternate stack of a running script.
#[derive(Debug, Clone, Default)]
pub struct Stack {
    items: Vec<Vec<u8>>,
    max_num_length: usize,
    minimal_data: bool,
}

impl Stack {
    /// An empty stack whose numeric reads accept operands up to
    /// `max_num_length` bytes, minimally encoded when `minimal_data` is set.
    pub fn new(max_num_length: usize, minimal_data: bool) -> Self {
        Stack {
            items: Vec::new(),
            max_num_length,
            minimal_data,
        }
    }

    pub fn depth(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether numeric reads reject non-minimal encodings.
    pub fn requires_minimal_data(&self) -> bool {
        self.minimal_data
    }

    /// The elements, bottom first.
    pub fn items(&self) -> &[Vec<u8>] {
        &self.items
    }

    /// Swap in a new set of elements, bottom first.
    pub fn replace(&mut self, items: Vec<Vec<u8>>) {
        self.items = items;
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn push(&mut self, data: Vec<u8>) {
        self.items.push(data);
    }

    pub fn push_int(&mut self, n: &ScriptNumber) {
        self.push(n.to_bytes());
    }

    pub fn push_bool(&mut self, val: bool) {
        self.push(from_bool(val));
    }

    pub fn pop(&mut self) -> Result<Vec<u8>, InterpreterError> {
        self.items.pop().ok_or_else(|| underflow(1, 0))
    }

    pub fn pop_int(&mut self) -> Result<ScriptNumber, InterpreterError> {
        let data = self.pop()?;
        self.decode_int(&data)
    }

    pub fn pop_bool(&mut self) -> Result<bool, InterpreterError> {
        Ok(as_bool(&self.pop()?))
    }

    /// Copy of the element `depth` items below the top.
    pub fn peek(&self, depth: usize) -> Result<Vec<u8>, InterpreterError> {
        let pos = self.position(depth)?;
        Ok(self.items[pos].clone())
    }

    pub fn peek_int(&self, depth: usize) -> Result<ScriptNumber, InterpreterError> {
        let pos = self.position(depth)?;
        self.decode_int(&self.items[pos])
    }

    pub fn peek_bool(&self, depth: usize) -> Result<bool, InterpreterError> {
        let pos = self.position(depth)?;
        Ok(as_bool(&self.items[pos]))
    }

    /// Delete the element `depth` items below the top.
    pub fn remove_at(&mut self, depth: usize) -> Result<(), InterpreterError> {
        self.take(depth).map(drop)
    }

    /// Pop the top `n` elements.
    pub fn drop_top(&mut self, n: usize) -> Result<(), InterpreterError> {
        let start = self.start_of(n)?;
        self.items.truncate(start);
        Ok(())
    }

    /// Push copies of the top `n` elements, keeping their order.
    pub fn dup_top(&mut self, n: usize) -> Result<(), InterpreterError> {
        let start = self.start_of(n)?;
        self.items.extend_from_within(start..);
        Ok(())
    }

    /// Push copies of the `n` elements sitting below the top `n`.
    pub fn over(&mut self, n: usize) -> Result<(), InterpreterError> {
        let start = self.start_of(2 * n)?;
        self.items.extend_from_within(start..start + n);
        Ok(())
    }

    /// Move the third group of `n` elements from the top onto the top.
    pub fn rotate(&mut self, n: usize) -> Result<(), InterpreterError> {
        let start = self.start_of(3 * n)?;
        self.items[start..].rotate_left(n);
        Ok(())
    }

    /// Exchange the top two groups of `n` elements.
    pub fn swap_pairs(&mut self, n: usize) -> Result<(), InterpreterError> {
        let start = self.start_of(2 * n)?;
        self.items[start..].rotate_left(n);
        Ok(())
    }

    /// Copy the top element below the second one.
    pub fn tuck(&mut self) -> Result<(), InterpreterError> {
        let start = self.start_of(2)?;
        let top = self.items[start + 1].clone();
        self.items.insert(start, top);
        Ok(())
    }

    /// Push a copy of the element `depth` items below the top.
    pub fn pick(&mut self, depth: usize) -> Result<(), InterpreterError> {
        let item = self.peek(depth)?;
        self.push(item);
        Ok(())
    }

    /// Move the element `depth` items below the top onto the top.
    pub fn roll(&mut self, depth: usize) -> Result<(), InterpreterError> {
        let item = self.take(depth)?;
        self.push(item);
        Ok(())
    }

    fn take(&mut self, depth: usize) -> Result<Vec<u8>, InterpreterError> {
        let pos = self.position(depth)?;
        Ok(self.items.remove(pos))
    }

    fn position(&self, depth: usize) -> Result<usize, InterpreterError> {
        let len = self.items.len();
        depth
            .checked_add(1)
            .and_then(|needed| len.checked_sub(needed))
            .ok_or_else(|| underflow(depth.saturating_add(1), len))
    }

    /// Index of the lowest of the top `n` elements.
    fn start_of(&self, n: usize) -> Result<usize, InterpreterError> {
        let len = self.items.len();
        len.checked_sub(n).ok_or_else(|| underflow(n, len))
    }

    fn decode_int(&self, data: &[u8]) -> Result<ScriptNumber, InterpreterError> {
        ScriptNumber::from_bytes(data, self.max_num_length, self.minimal_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack_of(values: &[u8]) -> Stack {
        let mut s = Stack::new(4, false);
        for v in values {
            s.push(vec![*v]);
        }
        s
    }

    fn contents(s: &Stack) -> Vec<u8> {
        s.items().iter().map(|item| item[0]).collect()
    }

    #[test]
    fn test_as_bool() {
        assert!(!as_bool(&[]));
        assert!(!as_bool(&[0x00]));
        assert!(!as_bool(&[0x80]));
        assert!(!as_bool(&[0x00, 0x00]));
        assert!(!as_bool(&[0x00, 0x80]));
        assert!(as_bool(&[0x01]));
        assert!(as_bool(&[0x00, 0x01]));
        assert!(as_bool(&[0x80, 0x00]));
        assert_eq!(from_bool(false), Vec::<u8>::new());
    }

    #[test]
    fn test_push_pop_peek() {
        let mut s = stack_of(&[1, 2, 3]);
        assert_eq!(s.depth(), 3);
        assert_eq!(s.peek(0).unwrap(), vec![3]);
        assert_eq!(s.peek(2).unwrap(), vec![1]);
        assert!(s.peek(3).is_err());
        assert_eq!(s.pop().unwrap(), vec![3]);
        assert_eq!(s.depth(), 2);
    }

    #[test]
    fn test_group_operations() {
        let mut s = stack_of(&[1, 2, 3, 4, 5, 6]);
        s.rotate(2).unwrap();
        assert_eq!(contents(&s), vec![3, 4, 5, 6, 1, 2]);
        s.swap_pairs(2).unwrap();
        assert_eq!(contents(&s), vec![3, 4, 1, 2, 5, 6]);
        s.over(1).unwrap();
        assert_eq!(contents(&s), vec![3, 4, 1, 2, 5, 6, 5]);
        s.dup_top(2).unwrap();
        assert_eq!(contents(&s), vec![3, 4, 1, 2, 5, 6, 5, 6, 5]);
        s.drop_top(4).unwrap();
        assert_eq!(contents(&s), vec![3, 4, 1, 2, 5]);
    }

    #[test]
    fn test_tuck_pick_roll() {
        let mut s = stack_of(&[1, 2, 3]);
        s.tuck().unwrap();
        assert_eq!(contents(&s), vec![1, 3, 2, 3]);
        s.pick(3).unwrap();
        assert_eq!(contents(&s), vec![1, 3, 2, 3, 1]);
        s.roll(2).unwrap();
        assert_eq!(contents(&s), vec![1, 3, 3, 1, 2]);
        s.remove_at(4).unwrap();
        assert_eq!(contents(&s), vec![3, 3, 1, 2]);
        assert!(s.roll(4).is_err());
    }

    #[test]
    fn test_underflow_leaves_stack_untouched() {
        let mut s = stack_of(&[1, 2]);
        for result in [s.rotate(1), s.over(2), s.dup_top(3), s.drop_top(3)] {
            assert_eq!(result.unwrap_err().code, InterpreterErrorCode::InvalidStackOperation);
        }
        assert_eq!(contents(&s), vec![1, 2]);

        let mut empty = Stack::new(4, false);
        assert_eq!(empty.pop().unwrap_err().code, InterpreterErrorCode::InvalidStackOperation);
        assert!(empty.tuck().is_err());
        assert!(empty.peek(usize::MAX).is_err());
    }

    #[test]
    fn test_pop_int_respects_limits() {
        let mut s = Stack::new(4, true);
        assert!(s.requires_minimal_data());
        s.push(vec![0x01, 0x00]);
        assert_eq!(s.pop_int().unwrap_err().code, InterpreterErrorCode::MinimalData);
        s.push_int(&ScriptNumber::new(-300));
        assert_eq!(s.peek_int(0).unwrap().value(), -300);
        assert_eq!(s.pop_int().unwrap().value(), -300);
        s.push(vec![1, 2, 3, 4, 5]);
        assert_eq!(
            s.pop_int().unwrap_err().code,
            InterpreterErrorCode::InvalidStackOperation
        );
    }
}
