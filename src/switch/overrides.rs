use serde::{Deserialize, Serialize};

/// Live changes to a switch position's parameters.
///
/// Every field is one-shot: whoever applies it takes it, so a stale override
/// can't re-apply after a later change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Override {
    /// Speed ordinal.
    #[serde(default)]
    pub speed: Option<usize>,
    #[serde(default)]
    pub shift: Option<usize>,
    /// Plateau length, in samples.
    #[serde(default)]
    pub size: Option<usize>,
    /// Fade-time ordinal.
    #[serde(default)]
    pub fade: Option<usize>,
    #[serde(default)]
    pub rotate_speed: Option<usize>,
    /// Index into the named colour table (or the colour wheel).
    #[serde(default)]
    pub color: Option<usize>,
    /// Gobo setting number.
    #[serde(default)]
    pub gobo: Option<usize>,
}

impl Override {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Fold a newer override into this one; newer fields win.
    pub fn merge(&mut self, newer: Override) {
        macro_rules! take_newer {
            ($($field:ident),*) => {
                $(if newer.$field.is_some() { self.$field = newer.$field; })*
            };
        }
        take_newer!(speed, shift, size, fade, rotate_speed, color, gobo);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_merge_and_take() {
        let mut o = Override {
            speed: Some(3),
            color: Some(1),
            ..Default::default()
        };
        o.merge(Override {
            speed: Some(20),
            gobo: Some(2),
            ..Default::default()
        });
        assert_eq!(Some(20), o.speed.take());
        assert_eq!(None, o.speed.take());
        assert_eq!(Some(1), o.color.take());
        assert_eq!(Some(2), o.gobo.take());
        assert!(o.is_empty());
    }
}
