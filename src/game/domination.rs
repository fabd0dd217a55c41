use serde::{Deserialize, Serialize};

/// 倒す判定：场上段数必须不少于出牌张数 + 1。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TakeCheck {
    pub required: usize,
    pub actual: usize,
}

impl TakeCheck {
    pub fn new(field_stack_len: usize, locked_count: usize) -> Self {
        Self {
            required: locked_count + 1,
            actual: field_stack_len,
        }
    }

    pub fn is_eligible(&self) -> bool {
        self.actual >= self.required
    }
}

pub fn take_eligible(field_stack_len: usize, locked_count: usize) -> bool {
    TakeCheck::new(field_stack_len, locked_count).is_eligible()
}
