//! Heap objects and string interning.
//!
//! Every object the VM allocates lives in a single [`Heap`] arena and is
//! addressed by an [`ObjRef`] index. Nothing is freed individually: the arena
//! is walked once and emptied when the VM shuts down.
//!
//! Strings are interned. For any byte content there is at most one string
//! object in the heap, so two `ObjRef`s to strings are equal exactly when
//! their contents are.

use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use log::trace;

/// Handle to an object stored in a [`Heap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjRef(u32);

impl ObjRef {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obj#{}", self.0)
    }
}

/// A heap object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Obj {
    /// Immutable, interned byte string
    String(ObjString),
}

impl Obj {
    pub fn as_string(&self) -> Option<&ObjString> {
        match self {
            Obj::String(s) => Some(s),
        }
    }
}

/// String object: content plus its precomputed hash. The content buffer is
/// shared with the interning table's key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjString {
    chars: Rc<[u8]>,
    hash: u32,
}

impl ObjString {
    fn new(chars: Rc<[u8]>, hash: u32) -> Self {
        Self { chars, hash }
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.chars
    }

    pub fn hash(&self) -> u32 {
        self.hash
    }

    /// Content as text; invalid UTF-8 sequences are replaced.
    pub fn as_str_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.chars)
    }
}

/// FNV-1a, 32 bit.
pub fn hash_bytes(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 2_166_136_261;
    for &b in bytes {
        hash ^= b as u32;
        hash = hash.wrapping_mul(16_777_619);
    }
    hash
}

/// Arena of every live object plus the string interning table.
#[derive(Debug, Default)]
pub struct Heap {
    objects: Vec<Obj>,
    /// Content -> canonical string.
    strings: AHashMap<Rc<[u8]>, ObjRef>,
}

impl Heap {
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            strings: AHashMap::new(),
        }
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Number of strings in the interning table.
    pub fn interned_count(&self) -> usize {
        self.strings.len()
    }

    pub fn get(&self, r: ObjRef) -> Option<&Obj> {
        self.objects.get(r.index())
    }

    pub fn string(&self, r: ObjRef) -> Option<&ObjString> {
        self.get(r).and_then(Obj::as_string)
    }

    /// True if `r` refers to a string object.
    pub fn is_string(&self, r: ObjRef) -> bool {
        self.string(r).is_some()
    }

    /// Intern a borrowed byte slice, copying it only when no canonical
    /// string with the same content exists yet.
    pub fn copy_string(&mut self, chars: &[u8]) -> ObjRef {
        if let Some(existing) = self.find_string(chars) {
            return existing;
        }
        self.allocate_string(Rc::from(chars))
    }

    /// Intern an owned buffer. If the content is already interned the buffer
    /// is dropped and the canonical string is returned; otherwise the buffer
    /// becomes the new string's storage.
    pub fn take_string(&mut self, chars: Vec<u8>) -> ObjRef {
        if let Some(existing) = self.find_string(&chars) {
            return existing;
        }
        self.allocate_string(Rc::from(chars))
    }

    /// Look up the canonical string for `chars`, if any.
    pub fn find_string(&self, chars: &[u8]) -> Option<ObjRef> {
        self.strings.get(chars).copied()
    }

    fn allocate_string(&mut self, chars: Rc<[u8]>) -> ObjRef {
        let len = chars.len();
        let hash = hash_bytes(&chars);
        let r = self.allocate(Obj::String(ObjString::new(Rc::clone(&chars), hash)));
        self.strings.insert(chars, r);
        trace!("interned {} ({} bytes, hash {:#010x})", r, len, hash);
        r
    }

    fn allocate(&mut self, obj: Obj) -> ObjRef {
        let r = ObjRef(self.objects.len() as u32);
        self.objects.push(obj);
        r
    }

    /// Release the interning table and every object. Returns how many
    /// objects were freed. Existing `ObjRef`s become dangling, so only VM
    /// teardown calls this.
    pub(crate) fn free_objects(&mut self) -> usize {
        self.strings = AHashMap::new();
        let freed = self.objects.len();
        self.objects = Vec::new();
        freed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_string_interns() {
        let mut heap = Heap::new();
        let a = heap.copy_string(b"hello");
        let b = heap.copy_string(b"hello");
        let c = heap.copy_string(b"world");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(heap.len(), 2);
        assert_eq!(heap.interned_count(), 2);
    }

    #[test]
    fn test_take_string_reuses_canonical() {
        let mut heap = Heap::new();
        let copied = heap.copy_string(b"abc");
        let taken = heap.take_string(b"abc".to_vec());

        assert_eq!(copied, taken);
        assert_eq!(heap.len(), 1);
    }

    #[test]
    fn test_take_string_adopts_new_buffer() {
        let mut heap = Heap::new();
        let r = heap.take_string(b"fresh".to_vec());

        let s = heap.string(r).expect("string object");
        assert_eq!(s.as_bytes(), b"fresh");
        assert_eq!(s.len(), 5);
        assert_eq!(s.hash(), hash_bytes(b"fresh"));
    }

    #[test]
    fn test_empty_string_is_interned() {
        let mut heap = Heap::new();
        let a = heap.copy_string(b"");
        let b = heap.take_string(Vec::new());
        assert_eq!(a, b);
        assert!(heap.string(a).map_or(false, ObjString::is_empty));
    }

    #[test]
    fn test_find_string_by_content() {
        let mut heap = Heap::new();
        let abc = heap.copy_string(b"abc");
        heap.take_string(b"abd".to_vec());

        assert_eq!(heap.find_string(b"abc"), Some(abc));
        assert_eq!(heap.find_string(b"ab"), None);
        assert_eq!(heap.interned_count(), 2);
        assert_eq!(heap.len(), heap.interned_count());
    }

    #[test]
    fn test_fnv1a_known_values() {
        assert_eq!(hash_bytes(b""), 2_166_136_261);
        assert_eq!(hash_bytes(b"a"), 0xe40c_292c);
    }

    #[test]
    fn test_free_objects_counts_everything() {
        let mut heap = Heap::new();
        heap.copy_string(b"one");
        heap.copy_string(b"two");
        heap.copy_string(b"one");

        assert_eq!(heap.free_objects(), 2);
        assert!(heap.is_empty());
        assert_eq!(heap.interned_count(), 0);
    }

    #[test]
    fn test_interning_after_free_starts_fresh() {
        let mut heap = Heap::new();
        heap.copy_string(b"x");
        heap.free_objects();
        let r = heap.copy_string(b"x");
        assert_eq!(heap.len(), 1);
        assert_eq!(heap.string(r).map(ObjString::as_bytes), Some(&b"x"[..]));
    }
}
