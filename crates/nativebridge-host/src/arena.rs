use std::cell::RefCell;
use std::ptr::NonNull;

/// Owning list of heap objects with stable addresses.
///
/// Objects are leaked out of their `Box` on insertion and reclaimed on
/// [`Arena::remove`] or drop, so pointers handed out stay valid for as long
/// as the object is a member.
pub(crate) struct Arena<T> {
    items: RefCell<Vec<NonNull<T>>>,
}

impl<T> Arena<T> {
    pub(crate) fn new() -> Self {
        Self {
            items: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn alloc(&self, value: T) -> NonNull<T> {
        let ptr = NonNull::from(Box::leak(Box::new(value)));
        self.items.borrow_mut().push(ptr);
        ptr
    }

    pub(crate) fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub(crate) fn get(&self, index: usize) -> Option<NonNull<T>> {
        self.items.borrow().get(index).copied()
    }

    pub(crate) fn position(&self, ptr: NonNull<T>) -> Option<usize> {
        self.items.borrow().iter().position(|item| *item == ptr)
    }

    pub(crate) fn contains(&self, ptr: NonNull<T>) -> bool {
        self.position(ptr).is_some()
    }

    pub(crate) fn snapshot(&self) -> Vec<NonNull<T>> {
        self.items.borrow().clone()
    }

    pub(crate) fn find(&self, mut pred: impl FnMut(&T) -> bool) -> Option<NonNull<T>> {
        let items = self.items.borrow();
        // SAFETY: every member is a live allocation owned by this arena.
        items
            .iter()
            .copied()
            .find(|item| pred(unsafe { item.as_ref() }))
    }

    /// Detaches a member and returns ownership of it.
    pub(crate) fn remove(&self, ptr: NonNull<T>) -> Option<Box<T>> {
        let mut items = self.items.borrow_mut();
        let index = items.iter().position(|item| *item == ptr)?;
        items.remove(index);
        // SAFETY: the pointer came from `Box::leak` in `alloc` and was a member
        // until the line above.
        Some(unsafe { Box::from_raw(ptr.as_ptr()) })
    }

    pub(crate) fn clear(&self) -> Vec<Box<T>> {
        let items = std::mem::take(&mut *self.items.borrow_mut());
        items
            .into_iter()
            // SAFETY: see `remove`.
            .map(|ptr| unsafe { Box::from_raw(ptr.as_ptr()) })
            .collect()
    }
}

impl<T> Drop for Arena<T> {
    fn drop(&mut self) {
        drop(self.clear());
    }
}
