//! Fully-qualified dotted names.
//!
//! Grounded on `utility/fqname.cpp` (the richer of the two inconsistent
//! original drafts — see `DESIGN.md`). A name is a count of leading dots
//! (`0` = plain relative, `1` = absolute, `>=2` = relative with
//! `leading_dots - 1` levels of upward reference) plus a sequence of
//! dot-separated identifier components.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fqname {
    leading_dots: usize,
    components: Vec<String>,
}

impl Fqname {
    pub fn parse(s: &str) -> Fqname {
        if s.is_empty() {
            return Fqname {
                leading_dots: 0,
                components: Vec::new(),
            };
        }
        let leading_dots = s.chars().take_while(|&c| c == '.').count();
        let remainder = &s[leading_dots..];
        let components = if remainder.is_empty() {
            Vec::new()
        } else {
            remainder.split('.').map(|c| c.to_owned()).collect()
        };
        Fqname {
            leading_dots,
            components,
        }
    }

    pub fn from_component(component: &str) -> Fqname {
        Fqname {
            leading_dots: 0,
            components: vec![component.to_owned()],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.leading_dots == 0 && self.components.is_empty()
    }

    pub fn is_absolute(&self) -> bool {
        self.leading_dots == 1
    }

    pub fn is_relative(&self) -> bool {
        !self.is_absolute()
    }

    /// Number of levels of upward reference implied by leading dots beyond
    /// the first (an absolute or plain-relative name has zero).
    pub fn up_levels(&self) -> usize {
        self.leading_dots.saturating_sub(1)
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Iterates components, skipping the leading-dot prefix (scenario S5).
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.components.iter().map(|s| s.as_str())
    }

    pub fn last(&self) -> Option<&str> {
        self.components.last().map(|s| s.as_str())
    }

    pub fn pop_component(&self) -> Fqname {
        if self.is_empty() {
            return Fqname {
                leading_dots: 2,
                components: Vec::new(),
            };
        }
        if self.leading_dots == 1 && self.components.is_empty() {
            return self.clone();
        }
        if self.leading_dots >= 2 && self.components.is_empty() {
            return Fqname {
                leading_dots: self.leading_dots + 1,
                components: Vec::new(),
            };
        }
        if self.leading_dots == 0 && self.components.len() == 1 {
            return Fqname {
                leading_dots: 0,
                components: Vec::new(),
            };
        }
        let mut components = self.components.clone();
        components.pop();
        Fqname {
            leading_dots: self.leading_dots,
            components,
        }
    }

    pub fn add_component(&self, component: &str) -> Fqname {
        if component.is_empty() {
            return self.pop_component();
        }
        let mut components = self.components.clone();
        components.push(component.to_owned());
        Fqname {
            leading_dots: self.leading_dots,
            components,
        }
    }

    /// Concatenates `self / rhs`, matching `fqname.cpp`'s `operator/`.
    pub fn join(&self, rhs: &Fqname) -> Fqname {
        if rhs.is_absolute() {
            return rhs.clone();
        }
        if rhs.leading_dots == 0 {
            let mut result = self.clone();
            for c in &rhs.components {
                result = result.add_component(c);
            }
            return result;
        }
        let mut result = self.clone();
        for _ in 0..(rhs.leading_dots - 1) {
            result = result.pop_component();
        }
        for c in &rhs.components {
            result = result.add_component(c);
        }
        result
    }

    /// Canonicalises: drops accidental empty components, preserves the
    /// leading-dot prefix count.
    pub fn lexically_normal(&self) -> Fqname {
        let components: Vec<String> = self
            .components
            .iter()
            .filter(|c| !c.is_empty())
            .cloned()
            .collect();
        Fqname {
            leading_dots: self.leading_dots,
            components,
        }
    }

    pub fn lexically_absolute(&self, base: &Fqname) -> Fqname {
        base.join(self).lexically_normal()
    }

    pub fn is_subname_of(&self, other: &Fqname) -> bool {
        is_child_of(self, other)
    }
}

pub fn is_child_of(child: &Fqname, parent: &Fqname) -> bool {
    child.leading_dots == parent.leading_dots
        && child.components.len() > parent.components.len()
        && child.components[..parent.components.len()] == parent.components[..]
}

impl fmt::Display for Fqname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", ".".repeat(self.leading_dots))?;
        write!(f, "{}", self.components.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iterate_skips_prefix() {
        let n = Fqname::parse(".a.b.c");
        assert_eq!(n.iter().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn pop_component_scenarios() {
        assert_eq!(Fqname::parse(".a").pop_component().to_string(), ".");
        assert_eq!(Fqname::parse("..").pop_component().to_string(), "...");
        assert_eq!(Fqname::parse("a").pop_component().to_string(), "");
        assert_eq!(Fqname::parse("a.b").pop_component().to_string(), "a");
    }

    #[test]
    fn join_absolute_replaces() {
        let lhs = Fqname::parse(".a.b");
        let rhs = Fqname::parse(".x.y");
        assert_eq!(lhs.join(&rhs).to_string(), ".x.y");
    }

    #[test]
    fn join_relative_appends() {
        let lhs = Fqname::parse(".a.b");
        let rhs = Fqname::parse("c");
        assert_eq!(lhs.join(&rhs).to_string(), ".a.b.c");
    }

    #[test]
    fn join_up_reference_pops_then_appends() {
        let lhs = Fqname::parse(".a.b");
        let rhs = Fqname::parse("..c");
        assert_eq!(lhs.join(&rhs).to_string(), ".a.c");
    }

    #[test]
    fn is_child_of_basic() {
        let parent = Fqname::parse(".a.b");
        let child = Fqname::parse(".a.b.c");
        assert!(child.is_subname_of(&parent));
        assert!(!parent.is_subname_of(&child));
    }
}
