//! Sequence of actions run in reverse registration order

pub type Action<T> = Box<dyn Fn(&T) + Send + Sync>;

pub struct ActionStack<T: ?Sized> {
    actions: Vec<Action<T>>,
}

impl<T: ?Sized> Default for ActionStack<T> {
    fn default() -> Self {
        Self { actions: Vec::new() }
    }
}

impl<T: ?Sized> ActionStack<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call every action with `data`, latest first
    pub fn run(&self, data: &T) {
        for action in self.actions.iter().rev() {
            action(data);
        }
    }

    pub fn extend<F>(&mut self, action: F)
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.actions.push(Box::new(action));
    }

    pub fn clear(&mut self) {
        self.actions.clear();
    }

    pub fn count(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
