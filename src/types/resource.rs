use super::{Build, Image, Key, Object, Variable};

/// Capability shared by every resource kind the authorization gate can
/// dispatch over: an unconditional owner and an optional namespace scope.
///
/// New resource kinds only need to implement this trait; the gate itself
/// never has to change.
pub trait OwnedResource {
    fn owner_id(&self) -> i64;
    fn namespace_id(&self) -> Option<i64>;
}

macro_rules! impl_owned_resource {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl OwnedResource for $ty {
                fn owner_id(&self) -> i64 {
                    self.user_id
                }

                fn namespace_id(&self) -> Option<i64> {
                    self.namespace_id
                }
            }
        )+
    };
}

impl_owned_resource!(Build, Object, Variable, Key, Image);
