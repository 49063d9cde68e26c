use std::{collections::BTreeMap, sync::Arc};

#[derive(Clone, Debug, Eq, Default)]
pub struct Labels(Arc<Map>);

pub type Map = BTreeMap<String, String>;

/// Selects workloads by their pod template labels, as a `Service` does.
///
/// Unlike a `LabelSelector`, an empty selector selects nothing.
#[derive(Clone, Debug, Eq, PartialEq, Default)]
pub struct Selector(Map);

// === Selector ===

impl Selector {
    pub fn from_map(map: Map) -> Self {
        Self(map)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true iff the selector is non-empty and every key/value pair is present in `labels`.
    pub fn matches(&self, labels: &Labels) -> bool {
        if self.0.is_empty() {
            return false;
        }

        self.0.iter().all(|(k, v)| labels.0.get(k) == Some(v))
    }
}

impl From<Option<&Map>> for Selector {
    fn from(map: Option<&Map>) -> Self {
        map.cloned().map(Self).unwrap_or_default()
    }
}

impl std::iter::FromIterator<(String, String)> for Selector {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self::from_map(iter.into_iter().collect())
    }
}

impl std::iter::FromIterator<(&'static str, &'static str)> for Selector {
    fn from_iter<T: IntoIterator<Item = (&'static str, &'static str)>>(iter: T) -> Self {
        Self::from_map(
            iter.into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

// === Labels ===

impl From<Map> for Labels {
    #[inline]
    fn from(labels: Map) -> Self {
        Self(Arc::new(labels))
    }
}

impl AsRef<Map> for Labels {
    #[inline]
    fn as_ref(&self) -> &Map {
        self.0.as_ref()
    }
}

impl<T: AsRef<Map>> std::cmp::PartialEq<T> for Labels {
    #[inline]
    fn eq(&self, t: &T) -> bool {
        self.0.as_ref().eq(t.as_ref())
    }
}

impl std::iter::FromIterator<(String, String)> for Labels {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(Arc::new(iter.into_iter().collect()))
    }
}

impl std::iter::FromIterator<(&'static str, &'static str)> for Labels {
    fn from_iter<T: IntoIterator<Item = (&'static str, &'static str)>>(iter: T) -> Self {
        iter.into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::iter::FromIterator;

    #[test]
    fn test_matches() {
        for (selector, labels, matches, msg) in &[
            (Selector::default(), Labels::default(), false, "empty selector"),
            (
                Selector::default(),
                Labels::from_iter(Some(("app", "api"))),
                false,
                "empty selector never matches",
            ),
            (
                Selector::from_iter(Some(("app", "api"))),
                Labels::from_iter(Some(("app", "api"))),
                true,
                "exact label match",
            ),
            (
                Selector::from_iter(Some(("app", "x"))),
                Labels::from_iter(vec![("app", "x"), ("tier", "web")]),
                true,
                "subset label match",
            ),
            (
                Selector::from_iter(vec![("app", "x"), ("tier", "web")]),
                Labels::from_iter(Some(("app", "x"))),
                false,
                "missing label",
            ),
            (
                Selector::from_iter(Some(("app", "x"))),
                Labels::from_iter(Some(("app", "y"))),
                false,
                "mismatched value",
            ),
        ] {
            assert_eq!(selector.matches(labels), *matches, "{}", msg);
        }
    }

    #[test]
    fn from_optional_map() {
        assert!(Selector::from(None).is_empty());

        let map = maplit::btreemap! { "app".to_string() => "api".to_string() };
        let selector = Selector::from(Some(&map));
        assert!(selector.matches(&Labels::from(map.clone())));
    }
}
