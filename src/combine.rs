use crate::config::CombineStrategy;
use crate::error::{Error, Result};
use crate::types::{Field, Window};

impl CombineStrategy {
    /// Build the joint window whose compressed size feeds the distance.
    pub fn combine(&self, a: &Window, b: &Window) -> Result<Window> {
        match self {
            CombineStrategy::Interleave => interleave(a, b),
            CombineStrategy::Concat => Ok(concat(a, b)),
        }
    }
}

/// `a[0], b[0], a[1], b[1], ...` per field.
pub fn interleave(a: &Window, b: &Window) -> Result<Window> {
    let mut out = Window::with_capacity(a.len() + b.len());
    for field in Field::ALL {
        let (xs, ys) = (a.field(field), b.field(field));
        if xs.len() != ys.len() {
            return Err(Error::LengthMismatch {
                field,
                left: xs.len(),
                right: ys.len(),
            });
        }
        let dst = out.field_mut(field);
        for (x, y) in xs.iter().zip(ys) {
            dst.push(*x);
            dst.push(*y);
        }
    }
    Ok(out)
}

pub fn concat(a: &Window, b: &Window) -> Window {
    let mut out = Window::with_capacity(a.len() + b.len());
    for field in Field::ALL {
        let dst = out.field_mut(field);
        dst.extend_from_slice(a.field(field));
        dst.extend_from_slice(b.field(field));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_window(start: f64, len: usize) -> Window {
        let mut window = Window::default();
        for i in 0..len {
            let v = start + i as f64;
            for field in Field::ALL {
                window.field_mut(field).push(v);
            }
        }
        window
    }

    #[test]
    fn test_interleave_alternates() {
        let a = make_window(0.0, 3);
        let b = make_window(10.0, 3);
        let joint = CombineStrategy::Interleave.combine(&a, &b).unwrap();
        for field in Field::ALL {
            assert_eq!(joint.field(field), &[0.0, 10.0, 1.0, 11.0, 2.0, 12.0]);
        }
    }

    #[test]
    fn test_interleave_length_mismatch() {
        let a = make_window(0.0, 3);
        let b = make_window(0.0, 4);
        let result = CombineStrategy::Interleave.combine(&a, &b);
        assert!(matches!(
            result,
            Err(Error::LengthMismatch {
                field: Field::Open,
                left: 3,
                right: 4
            })
        ));
    }

    #[test]
    fn test_concat_any_lengths() {
        let a = make_window(0.0, 2);
        let b = make_window(5.0, 3);
        let joint = CombineStrategy::Concat.combine(&a, &b).unwrap();
        assert_eq!(joint.len(), 5);
        for field in Field::ALL {
            assert_eq!(joint.field(field), &[0.0, 1.0, 5.0, 6.0, 7.0]);
        }

        let empty = Window::default();
        assert_eq!(CombineStrategy::Concat.combine(&empty, &b).unwrap(), b);
    }
}
