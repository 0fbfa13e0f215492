/// 命令行覆盖前的原值槽位。
/// `SetTo(v)` 记录被覆盖之前的值 v（可以是空字符串），`Unset` 表示本次命令没有覆盖。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Override<T> {
    #[default]
    Unset,
    SetTo(T),
}

impl<T> Override<T> {
    /// 记录原值，只有第一次生效。返回是否记录成功。
    pub fn capture(&mut self, original: T) -> bool {
        match self {
            Override::Unset => {
                *self = Override::SetTo(original);
                true
            }
            Override::SetTo(_) => false,
        }
    }

    pub fn is_set(&self) -> bool {
        matches!(self, Override::SetTo(_))
    }

    pub fn get(&self) -> Option<&T> {
        match self {
            Override::SetTo(v) => Some(v),
            Override::Unset => None,
        }
    }
}
