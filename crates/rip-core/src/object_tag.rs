//! Debug-only object verification, replacing `objnamer.h`'s PJW-hash
//! identity string with a tagged-variant discriminator carried by the
//! structure itself (`spec.md` §9 "Stateful object naming / debug
//! verification").

/// The small, closed set of render-info shapes that pass through the core,
/// used only to verify that a reference was handed back to the right
/// stage rather than to identify it by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectTag {
    RenderInfo,
    BlitChain,
    PatternForm,
    GouraudTriangle,
    ExpandedImage,
}

/// Asserts `$value.tag() == $expected` in debug builds; compiles to nothing
/// in release, per `spec.md` §9 "verification becomes a match on the
/// variant, freely optimised out in release".
#[macro_export]
macro_rules! verify_object {
    ($value:expr, $expected:expr) => {
        #[cfg(debug_assertions)]
        {
            let tag = $value.tag();
            debug_assert_eq!(
                tag, $expected,
                "object tag mismatch: expected {:?}, found {:?}",
                $expected, tag
            );
        }
    };
}

/// Implemented by every structure that should carry a verifiable
/// [`ObjectTag`].
pub trait Tagged {
    fn tag(&self) -> ObjectTag;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Thing;
    impl Tagged for Thing {
        fn tag(&self) -> ObjectTag {
            ObjectTag::RenderInfo
        }
    }

    #[test]
    fn verify_object_passes_on_matching_tag() {
        let thing = Thing;
        verify_object!(thing, ObjectTag::RenderInfo);
    }

    #[test]
    #[should_panic(expected = "object tag mismatch")]
    fn verify_object_panics_on_mismatch() {
        let thing = Thing;
        verify_object!(thing, ObjectTag::BlitChain);
    }
}
