use crate::constant_pool::ConstantPool;

pub mod listing;

pub struct Context<'pool> {
    pub pool: &'pool ConstantPool,
}

/// Analogous to [`std::fmt::Display`], but also contains the program context,
/// such as the current [`ConstantPool`].
pub trait Show {
    fn show(&self, f: &mut std::fmt::Formatter<'_>, ctx: &Context<'_>) -> std::fmt::Result;

    /// Returns a type which can be displayed.
    fn display<'a>(&'a self, ctx: &'a Context<'a>) -> impl std::fmt::Display + 'a
    where
        Self: Sized,
    {
        Display(self, ctx)
    }
}

struct Display<'this, 'ctx, 'pool, T: Show>(pub &'this T, pub &'ctx Context<'pool>);

impl<T> std::fmt::Display for Display<'_, '_, '_, T>
where
    T: Show,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Display(this, ctx) = self;
        this.show(f, ctx)
    }
}
