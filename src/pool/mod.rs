
use std::cell::RefCell;
use std::ops::{Deref, DerefMut};

use crate::parser::functions::MAX_ARITY;
use crate::parser::token::Token;

//..................................................................

/// Number of buffers of each kind to preallocate.
const PREALLOCATED_BUFFERS: usize = 4;

/// Starting capacity for token lists, enough for most expressions without a
/// mid-parse reallocation.
const TOKEN_LIST_CAPACITY: usize = 64;

const OPERAND_STACK_CAPACITY: usize = 32;

/// BufferPool hands out the scratch storage used transiently while an
/// expression is tokenized, converted and evaluated: token lists, operand
/// stacks and function-argument buffers.
///
/// Each checkout returns a guard that releases the buffer when dropped, so a
/// failure partway through an evaluation still returns the buffer to the
/// pool. Released buffers are cleared, not deallocated, which keeps the
/// steady state free of allocation. Recursive formula evaluation draws fresh
/// stacks while outer guards are still alive, so the pools sit behind
/// RefCells.
pub struct BufferPool {
    token_lists: RefCell<Vec<Vec<Token>>>,
    operand_stacks: RefCell<Vec<Vec<f32>>>,
    argument_buffers: RefCell<Vec<Vec<f32>>>,
}

impl BufferPool {
    pub fn new() -> Self {
        fn preallocate<T>(capacity: usize) -> RefCell<Vec<Vec<T>>> {
            RefCell::new(
                (0..PREALLOCATED_BUFFERS)
                    .map(|_| Vec::with_capacity(capacity))
                    .collect(),
            )
        }
        BufferPool {
            token_lists: preallocate(TOKEN_LIST_CAPACITY),
            operand_stacks: preallocate(OPERAND_STACK_CAPACITY),
            argument_buffers: preallocate(MAX_ARITY),
        }
    }

    pub fn token_list(&self) -> PooledBuffer<Token> {
        Self::checkout(&self.token_lists, TOKEN_LIST_CAPACITY)
    }

    pub fn operand_stack(&self) -> PooledBuffer<f32> {
        Self::checkout(&self.operand_stacks, OPERAND_STACK_CAPACITY)
    }

    pub fn argument_buffer(&self) -> PooledBuffer<f32> {
        Self::checkout(&self.argument_buffers, MAX_ARITY)
    }

    /// Hand out an idle buffer, or allocate a fresh one when the pool has run
    /// dry; the newcomer joins the pool on release.
    fn checkout<T>(home: &RefCell<Vec<Vec<T>>>, capacity: usize) -> PooledBuffer<T> {
        let buffer = home
            .borrow_mut()
            .pop()
            .unwrap_or_else(|| Vec::with_capacity(capacity));
        PooledBuffer { home, buffer: Some(buffer) }
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        BufferPool::new()
    }
}

//..................................................................

/// A buffer on loan from the pool. Dereferences to the underlying Vec and
/// returns the buffer, cleared, to the pool when dropped.
pub struct PooledBuffer<'p, T> {
    home: &'p RefCell<Vec<Vec<T>>>,
    buffer: Option<Vec<T>>,
}

impl<'p, T> Deref for PooledBuffer<'p, T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Vec<T> {
        match &self.buffer {
            Some(buffer) => buffer,
            None => panic!("pooled buffer used after release"),
        }
    }
}

impl<'p, T> DerefMut for PooledBuffer<'p, T> {
    fn deref_mut(&mut self) -> &mut Vec<T> {
        match &mut self.buffer {
            Some(buffer) => buffer,
            None => panic!("pooled buffer used after release"),
        }
    }
}

impl<'p, T> Drop for PooledBuffer<'p, T> {
    fn drop(&mut self) {
        if let Some(mut buffer) = self.buffer.take() {
            buffer.clear();
            self.home.borrow_mut().push(buffer);
        }
    }
}

//..................................................................
