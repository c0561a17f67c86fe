/// Running byte offset into the source, advanced by the front end as it
/// consumes input so nodes can be stamped with a position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Location {
    offset: usize,
}

impl Location {
    pub fn new() -> Self {
        Location { offset: 0 }
    }

    pub fn advance(&mut self, n: usize) {
        self.offset += n;
    }

    pub fn current(&self) -> usize {
        self.offset
    }

    pub fn reset(&mut self) {
        self.offset = 0;
    }
}
