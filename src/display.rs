//! Adapters for logging slices and array shapes.

use std::fmt::{Display, Formatter};

pub struct DisplaySlice<'a, D: Display> {
    items: &'a [D],
}
impl<'a, D: Display> Display for DisplaySlice<'a, D> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (index, item) in self.items.iter().enumerate() {
            if index != 0 {
                write!(f, ", ")?;
            }
            match f.precision() {
                Some(precision) => write!(f, "{item:.precision$}")?,
                None => write!(f, "{item}")?,
            }
        }
        write!(f, "]")
    }
}

impl<'a, D: Display> From<&'a [D]> for DisplaySlice<'a, D> {
    fn from(items: &'a [D]) -> Self {
        DisplaySlice { items }
    }
}

/// Renders a `(rows, cols)` shape the way device resolutions are usually quoted: `width x height`.
pub struct DisplayShape(pub (usize, usize));

impl Display for DisplayShape {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let (rows, cols) = self.0;
        write!(f, "{cols}x{rows}")
    }
}
