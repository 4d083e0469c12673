macro_rules! object {
    ($t:ident, $s:ident) => {
        impl TryFrom<$crate::object::Object> for $t {
            type Error = ();

            fn try_from(value: $crate::object::Object) -> core::result::Result<Self, Self::Error> {
                match value {
                    $crate::object::Object::$s(b) => Ok(b),
                    _ => Err(()),
                }
            }
        }

        impl From<$t> for $crate::object::Object {
            fn from(value: $t) -> Self {
                Self::$s(value)
            }
        }
    };
}

pub(crate) use object;
