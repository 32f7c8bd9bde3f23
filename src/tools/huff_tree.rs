//! Static Huffman tree and its companions.
//!
//! * `FrequencyTable` counts symbols in the input
//! * `HuffTree` is built greedily from the table
//! * `CodeTable` maps each symbol to its path from the root
//!
//! Children are boxed and owned by their parent, so dropping the root releases
//! the whole tree, whatever path the caller took out.

use bit_vec::BitVec;
use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use crate::tools::min_queue::MinQueue;

/// A byte value, the end of stream marker, or the internal node marker.
/// Must be wider than a byte so the markers cannot collide with data.
pub type Symbol = u16;

/// Synthetic symbol terminating every encoded payload.
pub const END_OF_STREAM: Symbol = 256;
/// Carried by internal nodes, never encoded.
pub const NOT_A_SYMBOL: Symbol = 257;
/// Width of a symbol field in the header, enough to hold `END_OF_STREAM`.
pub const SYMBOL_BITS: usize = 9;
/// Every byte value plus the end of stream symbol.
pub const MAX_LEAVES: usize = 257;

/// Occurrence count of each symbol, iterated in ascending symbol order.
/// The end of stream symbol is always present with count 1.
#[derive(Debug,Clone,PartialEq)]
pub struct FrequencyTable {
    counts: BTreeMap<Symbol,usize>
}

impl FrequencyTable {
    fn new() -> Self {
        Self {
            counts: BTreeMap::new()
        }
    }
    fn add(&mut self,byte: u8) {
        *self.counts.entry(byte as Symbol).or_insert(0) += 1;
    }
    fn close(mut self) -> Self {
        self.counts.insert(END_OF_STREAM,1);
        self
    }
    /// Count bytes until the reader is exhausted.
    pub fn from_reader<R: Read>(reader: &mut R) -> Result<Self,std::io::Error> {
        let mut ans = Self::new();
        for byte in reader.bytes() {
            ans.add(byte?);
        }
        Ok(ans.close())
    }
    #[cfg(test)]
    pub fn from_slice(dat: &[u8]) -> Self {
        let mut ans = Self::new();
        for byte in dat {
            ans.add(*byte);
        }
        ans.close()
    }
    /// count for the symbol, 0 if absent
    #[cfg(test)]
    pub fn get(&self,sym: Symbol) -> usize {
        *self.counts.get(&sym).unwrap_or(&0)
    }
    /// number of distinct symbols, including end of stream
    pub fn len(&self) -> usize {
        self.counts.len()
    }
    /// number of bytes counted, end of stream excluded
    pub fn total(&self) -> u64 {
        self.counts.iter()
            .filter(|(sym,_)| **sym < END_OF_STREAM)
            .map(|(_,count)| *count as u64)
            .sum()
    }
    pub fn iter(&self) -> impl Iterator<Item = (Symbol,usize)> + '_ {
        self.counts.iter().map(|(sym,count)| (*sym,*count))
    }
}

/// Node of the Huffman tree.  A leaf has no children and carries a real symbol,
/// an internal node has both children and carries `NOT_A_SYMBOL`.
#[derive(Debug,Clone,PartialEq)]
pub struct Node {
    pub symbol: Symbol,
    pub weight: usize,
    pub left: Option<Box<Node>>,
    pub right: Option<Box<Node>>
}

impl Node {
    pub fn leaf(symbol: Symbol,weight: usize) -> Self {
        Self {
            symbol,
            weight,
            left: None,
            right: None
        }
    }
    /// Join two subtrees, the weight is the sum of theirs.
    pub fn branch(left: Node,right: Node) -> Self {
        Self {
            symbol: NOT_A_SYMBOL,
            weight: left.weight + right.weight,
            left: Some(Box::new(left)),
            right: Some(Box::new(right))
        }
    }
    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
    /// child on the `false` (left) or `true` (right) side
    pub fn child(&self,bit: bool) -> Option<&Node> {
        match bit {
            false => self.left.as_deref(),
            true => self.right.as_deref()
        }
    }
    fn leaf_count(&self) -> usize {
        match (&self.left,&self.right) {
            (None,None) => 1,
            (l,r) => l.as_ref().map_or(0,|n| n.leaf_count()) + r.as_ref().map_or(0,|n| n.leaf_count())
        }
    }
    fn depth(&self) -> usize {
        let l = self.left.as_ref().map_or(0,|n| 1 + n.depth());
        let r = self.right.as_ref().map_or(0,|n| 1 + n.depth());
        usize::max(l,r)
    }
    fn contains(&self,sym: Symbol) -> bool {
        if self.is_leaf() {
            return self.symbol == sym;
        }
        self.left.as_ref().map_or(false,|n| n.contains(sym)) || self.right.as_ref().map_or(false,|n| n.contains(sym))
    }
    /// Same shape and leaf symbols, weights are not compared.
    #[cfg(test)]
    pub fn same_shape(&self,other: &Node) -> bool {
        if self.is_leaf() || other.is_leaf() {
            return self.is_leaf() && other.is_leaf() && self.symbol == other.symbol;
        }
        match (self.child(false),other.child(false),self.child(true),other.child(true)) {
            (Some(l1),Some(l2),Some(r1),Some(r2)) => l1.same_shape(l2) && r1.same_shape(r2),
            _ => false
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.symbol {
            END_OF_STREAM => write!(f,"(EOS, {})",self.weight),
            NOT_A_SYMBOL => write!(f,"(*, {})",self.weight),
            s if s < END_OF_STREAM && (s as u8).is_ascii_graphic() => write!(f,"('{}', {})",s as u8 as char,self.weight),
            s => write!(f,"(0x{:02x}, {})",s,self.weight)
        }
    }
}

/// Huffman tree, owns all of its nodes through the root.
#[derive(Debug,Clone,PartialEq)]
pub struct HuffTree {
    root: Node
}

impl HuffTree {
    /// Greedy construction: leaves are queued in table order, then the two
    /// lightest nodes are repeatedly joined, first dequeued on the left.
    /// A table with one entry gives a tree whose root is a leaf.
    pub fn build(table: &FrequencyTable) -> Result<Self,crate::Error> {
        let mut queue: MinQueue<Node,usize> = MinQueue::new();
        for (sym,count) in table.iter() {
            queue.enqueue(Node::leaf(sym,count),count);
        }
        if queue.is_empty() {
            log::error!("no symbols to build a tree from");
            return Err(crate::Error::EmptyTable);
        }
        log::debug!("building tree from {} symbols",queue.len());
        loop {
            let (first,w1) = queue.dequeue_min().ok_or(crate::Error::EmptyTable)?;
            match queue.dequeue_min() {
                Some((second,w2)) => {
                    log::trace!("join {} and {}",first,second);
                    queue.enqueue(Node::branch(first,second),w1 + w2);
                },
                None => {
                    let tree = Self::from_root(first);
                    log::debug!("tree has {} leaves, depth {}",tree.leaf_count(),tree.depth());
                    return Ok(tree);
                }
            }
        }
    }
    pub fn from_root(root: Node) -> Self {
        Self {
            root
        }
    }
    pub fn root(&self) -> &Node {
        &self.root
    }
    /// true if the root itself is a leaf, i.e., no codes have any length
    pub fn is_single_leaf(&self) -> bool {
        self.root.is_leaf()
    }
    pub fn leaf_count(&self) -> usize {
        self.root.leaf_count()
    }
    /// length of the longest root-to-leaf path
    pub fn depth(&self) -> usize {
        self.root.depth()
    }
    pub fn contains(&self,sym: Symbol) -> bool {
        self.root.contains(sym)
    }
}

/// Map from each symbol in a tree to its code, 0 for left, 1 for right.
pub struct CodeTable {
    codes: BTreeMap<Symbol,BitVec>
}

impl CodeTable {
    fn collect(node: &Node,path: &mut BitVec,codes: &mut BTreeMap<Symbol,BitVec>) {
        if node.is_leaf() {
            codes.insert(node.symbol,path.clone());
            return;
        }
        for bit in [false,true] {
            if let Some(child) = node.child(bit) {
                path.push(bit);
                Self::collect(child,path,codes);
                path.pop();
            }
        }
    }
    /// Depth first traversal.  For a single leaf tree the one code is empty.
    pub fn from_tree(tree: &HuffTree) -> Self {
        let mut codes = BTreeMap::new();
        let mut path = BitVec::new();
        Self::collect(tree.root(),&mut path,&mut codes);
        Self {
            codes
        }
    }
    pub fn get(&self,sym: Symbol) -> Option<&BitVec> {
        self.codes.get(&sym)
    }
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.codes.len()
    }
    pub fn iter(&self) -> impl Iterator<Item = (Symbol,&BitVec)> + '_ {
        self.codes.iter().map(|(sym,code)| (*sym,code))
    }
}

// *************** TESTS *****************

#[cfg(test)]
fn code_str(code: &BitVec) -> String {
    code.iter().map(|b| if b { '1' } else { '0' }).collect()
}

#[test]
fn frequency_table() {
    let table = FrequencyTable::from_reader(&mut "AAAB".as_bytes()).expect("read failed");
    assert_eq!(table,FrequencyTable::from_slice(b"AAAB"));
    assert_eq!(table.len(),3);
    assert_eq!(table.get(b'A' as Symbol),3);
    assert_eq!(table.get(b'B' as Symbol),1);
    assert_eq!(table.get(b'C' as Symbol),0);
    assert_eq!(table.get(END_OF_STREAM),1);
    assert_eq!(table.total(),4);
    let order: Vec<Symbol> = table.iter().map(|(sym,_)| sym).collect();
    assert_eq!(order,vec![65,66,END_OF_STREAM]);
}

#[test]
fn empty_input_table() {
    let table = FrequencyTable::from_slice(&[]);
    assert_eq!(table.len(),1);
    assert_eq!(table.get(END_OF_STREAM),1);
    assert_eq!(table.total(),0);
}

#[test]
fn tree_for_aaab() {
    let tree = HuffTree::build(&FrequencyTable::from_slice(b"AAAB")).expect("build failed");
    let expected = Node::branch(
        Node::branch(Node::leaf(b'B' as Symbol,1),Node::leaf(END_OF_STREAM,1)),
        Node::leaf(b'A' as Symbol,3)
    );
    assert_eq!(tree.root(),&expected);
    assert_eq!(tree.root().weight,5);
    assert_eq!(tree.root().symbol,NOT_A_SYMBOL);
    assert_eq!(tree.leaf_count(),3);
    assert_eq!(tree.depth(),2);
    let codes = CodeTable::from_tree(&tree);
    assert_eq!(codes.len(),3);
    assert_eq!(code_str(codes.get(b'A' as Symbol).unwrap()),"1");
    assert_eq!(code_str(codes.get(b'B' as Symbol).unwrap()),"00");
    assert_eq!(code_str(codes.get(END_OF_STREAM).unwrap()),"01");
    assert_eq!(format!("{}",tree.root().child(true).unwrap()),"('A', 3)");
}

#[test]
fn single_leaf_tree() {
    let tree = HuffTree::build(&FrequencyTable::from_slice(&[])).expect("build failed");
    assert!(tree.is_single_leaf());
    assert_eq!(tree.root().symbol,END_OF_STREAM);
    assert_eq!(tree.depth(),0);
    let codes = CodeTable::from_tree(&tree);
    assert_eq!(codes.len(),1);
    assert!(codes.get(END_OF_STREAM).unwrap().is_empty());
}

#[test]
fn leaf_count_is_distinct_plus_one() {
    let text = b"I am Sam. Sam I am. I do not like this Sam I am.\n";
    let mut distinct: Vec<u8> = text.to_vec();
    distinct.sort();
    distinct.dedup();
    let tree = HuffTree::build(&FrequencyTable::from_slice(text)).expect("build failed");
    assert_eq!(tree.leaf_count(),distinct.len() + 1);
    assert!(tree.contains(END_OF_STREAM));
    for byte in distinct {
        assert!(tree.contains(byte as Symbol));
    }
    assert!(!tree.contains(b'z' as Symbol));
}

#[test]
fn codes_are_prefix_free() {
    let all: Vec<u8> = (0..=255u8).chain(b"the quick brown fox jumps over the lazy dog".iter().copied()).collect();
    for dat in [&b"I am Sam. Sam I am. I do not like this Sam I am.\n"[..],&all[..]] {
        let tree = HuffTree::build(&FrequencyTable::from_slice(dat)).expect("build failed");
        let codes = CodeTable::from_tree(&tree);
        assert_eq!(codes.len(),tree.leaf_count());
        let list: Vec<String> = codes.iter().map(|(_,code)| code_str(code)).collect();
        for (i,a) in list.iter().enumerate() {
            assert!(!a.is_empty());
            for (j,b) in list.iter().enumerate() {
                if i != j {
                    assert!(!b.starts_with(a.as_str()),"{} is a prefix of {}",a,b);
                }
            }
        }
    }
}

#[test]
fn heavier_symbols_get_shorter_codes() {
    let tree = HuffTree::build(&FrequencyTable::from_slice(b"eeeeeeeeeeeeeeeetttttttaaq")).expect("build failed");
    let codes = CodeTable::from_tree(&tree);
    let len = |c: u8| codes.get(c as Symbol).unwrap().len();
    assert!(len(b'e') <= len(b't'));
    assert!(len(b't') <= len(b'a'));
    assert!(len(b'a') <= len(b'q'));
}

#[test]
fn empty_table_is_rejected() {
    let table = FrequencyTable::new();
    assert_eq!(table.len(),0);
    match HuffTree::build(&table) {
        Err(crate::Error::EmptyTable) => {},
        _ => panic!("expected EmptyTable")
    }
}
