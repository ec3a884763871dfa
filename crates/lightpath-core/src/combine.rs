/// Combine-latest join of three independently updating inputs.
///
/// Nothing is emitted until every input has produced at least one value.
/// After that, each update yields the new value alongside the most recent
/// value of the other two.
#[derive(Debug, Clone)]
pub struct CombineLatest<A, B, C> {
    a: Option<A>,
    b: Option<B>,
    c: Option<C>,
}

impl<A, B, C> Default for CombineLatest<A, B, C> {
    fn default() -> Self {
        Self {
            a: None,
            b: None,
            c: None,
        }
    }
}

impl<A, B, C> CombineLatest<A, B, C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_a(&mut self, value: A) -> Option<(&A, &B, &C)> {
        self.a = Some(value);
        self.latest()
    }

    pub fn push_b(&mut self, value: B) -> Option<(&A, &B, &C)> {
        self.b = Some(value);
        self.latest()
    }

    pub fn push_c(&mut self, value: C) -> Option<(&A, &B, &C)> {
        self.c = Some(value);
        self.latest()
    }

    /// Overwrite the third input without producing a combined value.
    pub fn reset_c(&mut self, value: C) {
        self.c = Some(value);
    }

    pub fn latest(&self) -> Option<(&A, &B, &C)> {
        match (&self.a, &self.b, &self.c) {
            (Some(a), Some(b), Some(c)) => Some((a, b, c)),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.latest().is_some()
    }
}
