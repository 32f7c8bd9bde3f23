//! Minimum priority queue with first-in-first-out ordering among equal priorities.
//!
//! The tie-breaking matters for Huffman trees: the order in which equal weights
//! are dequeued decides the shape of the tree, and hence the header.

use num_traits::PrimInt;
use std::cmp::{Ordering,Reverse};
use std::collections::BinaryHeap;

struct Entry<T,P: PrimInt> {
    priority: P,
    /// insertion sequence, earlier entries win ties
    seq: u64,
    item: T
}

impl <T,P: PrimInt> PartialEq for Entry<T,P> {
    fn eq(&self,other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl <T,P: PrimInt> Eq for Entry<T,P> {}

impl <T,P: PrimInt> PartialOrd for Entry<T,P> {
    fn partial_cmp(&self,other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl <T,P: PrimInt> Ord for Entry<T,P> {
    fn cmp(&self,other: &Self) -> Ordering {
        self.priority.cmp(&other.priority).then(self.seq.cmp(&other.seq))
    }
}

pub struct MinQueue<T,P: PrimInt> {
    heap: BinaryHeap<Reverse<Entry<T,P>>>,
    next_seq: u64
}

impl <T,P: PrimInt> MinQueue<T,P> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0
        }
    }
    pub fn enqueue(&mut self,item: T,priority: P) {
        self.heap.push(Reverse(Entry {
            priority,
            seq: self.next_seq,
            item
        }));
        self.next_seq += 1;
    }
    /// Remove the item with the smallest priority, among equals the one enqueued first.
    pub fn dequeue_min(&mut self) -> Option<(T,P)> {
        self.heap.pop().map(|Reverse(entry)| (entry.item,entry.priority))
    }
    pub fn len(&self) -> usize {
        self.heap.len()
    }
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

// *************** TESTS *****************

#[test]
fn ascending_priority() {
    let mut queue: MinQueue<char,usize> = MinQueue::new();
    queue.enqueue('c',30);
    queue.enqueue('a',10);
    queue.enqueue('b',20);
    assert_eq!(queue.len(),3);
    assert_eq!(queue.dequeue_min(),Some(('a',10)));
    assert_eq!(queue.dequeue_min(),Some(('b',20)));
    assert_eq!(queue.dequeue_min(),Some(('c',30)));
    assert_eq!(queue.dequeue_min(),None);
    assert!(queue.is_empty());
}

#[test]
fn ties_are_fifo() {
    let mut queue: MinQueue<&str,u32> = MinQueue::new();
    queue.enqueue("first",1);
    queue.enqueue("heavy",5);
    queue.enqueue("second",1);
    queue.enqueue("third",1);
    assert_eq!(queue.dequeue_min(),Some(("first",1)));
    queue.enqueue("fourth",1);
    assert_eq!(queue.dequeue_min(),Some(("second",1)));
    assert_eq!(queue.dequeue_min(),Some(("third",1)));
    assert_eq!(queue.dequeue_min(),Some(("fourth",1)));
    assert_eq!(queue.dequeue_min(),Some(("heavy",5)));
}
