//! Composite conveniences over [`Body`].
//!
//! Each method records exactly the instructions its spelled-out fluent
//! equivalent would: the two-literal forms push both operands and apply the
//! operation, the return forms push one literal and return. Integer
//! division and remainder use the signed forms.

use crate::body::Body;

pub trait BodyExt {
    /// Pushes `a` and `b` and adds them.
    fn add_i32(&mut self, a: i32, b: i32) -> &mut Self;
    fn add_i64(&mut self, a: i64, b: i64) -> &mut Self;
    fn add_f32(&mut self, a: f32, b: f32) -> &mut Self;
    fn add_f64(&mut self, a: f64, b: f64) -> &mut Self;

    /// Pushes `a` and `b` and subtracts `b` from `a`.
    fn sub_i32(&mut self, a: i32, b: i32) -> &mut Self;
    fn sub_i64(&mut self, a: i64, b: i64) -> &mut Self;
    fn sub_f32(&mut self, a: f32, b: f32) -> &mut Self;
    fn sub_f64(&mut self, a: f64, b: f64) -> &mut Self;

    /// Pushes `a` and `b` and multiplies them.
    fn mul_i32(&mut self, a: i32, b: i32) -> &mut Self;
    fn mul_i64(&mut self, a: i64, b: i64) -> &mut Self;
    fn mul_f32(&mut self, a: f32, b: f32) -> &mut Self;
    fn mul_f64(&mut self, a: f64, b: f64) -> &mut Self;

    /// Pushes `a` and `b` and divides `a` by `b`.
    fn div_i32(&mut self, a: i32, b: i32) -> &mut Self;
    fn div_i64(&mut self, a: i64, b: i64) -> &mut Self;
    fn div_f32(&mut self, a: f32, b: f32) -> &mut Self;
    fn div_f64(&mut self, a: f64, b: f64) -> &mut Self;

    /// Pushes `a` and `b` and takes `a` modulo `b`.
    fn rem_i32(&mut self, a: i32, b: i32) -> &mut Self;
    fn rem_i64(&mut self, a: i64, b: i64) -> &mut Self;

    /// Pushes `v` and returns it.
    fn ret_i32(&mut self, v: i32) -> &mut Self;
    fn ret_i64(&mut self, v: i64) -> &mut Self;
    fn ret_f32(&mut self, v: f32) -> &mut Self;
    fn ret_f64(&mut self, v: f64) -> &mut Self;

    /// Interns `s` and returns its (pointer, length) pair.
    fn ret_str(&mut self, s: &str) -> &mut Self;
}

impl BodyExt for Body {
    fn add_i32(&mut self, a: i32, b: i32) -> &mut Self {
        self.i32_const(a).i32_const(b).i32_add()
    }

    fn add_i64(&mut self, a: i64, b: i64) -> &mut Self {
        self.i64_const(a).i64_const(b).i64_add()
    }

    fn add_f32(&mut self, a: f32, b: f32) -> &mut Self {
        self.f32_const(a).f32_const(b).f32_add()
    }

    fn add_f64(&mut self, a: f64, b: f64) -> &mut Self {
        self.f64_const(a).f64_const(b).f64_add()
    }

    fn sub_i32(&mut self, a: i32, b: i32) -> &mut Self {
        self.i32_const(a).i32_const(b).i32_sub()
    }

    fn sub_i64(&mut self, a: i64, b: i64) -> &mut Self {
        self.i64_const(a).i64_const(b).i64_sub()
    }

    fn sub_f32(&mut self, a: f32, b: f32) -> &mut Self {
        self.f32_const(a).f32_const(b).f32_sub()
    }

    fn sub_f64(&mut self, a: f64, b: f64) -> &mut Self {
        self.f64_const(a).f64_const(b).f64_sub()
    }

    fn mul_i32(&mut self, a: i32, b: i32) -> &mut Self {
        self.i32_const(a).i32_const(b).i32_mul()
    }

    fn mul_i64(&mut self, a: i64, b: i64) -> &mut Self {
        self.i64_const(a).i64_const(b).i64_mul()
    }

    fn mul_f32(&mut self, a: f32, b: f32) -> &mut Self {
        self.f32_const(a).f32_const(b).f32_mul()
    }

    fn mul_f64(&mut self, a: f64, b: f64) -> &mut Self {
        self.f64_const(a).f64_const(b).f64_mul()
    }

    fn div_i32(&mut self, a: i32, b: i32) -> &mut Self {
        self.i32_const(a).i32_const(b).i32_div_s()
    }

    fn div_i64(&mut self, a: i64, b: i64) -> &mut Self {
        self.i64_const(a).i64_const(b).i64_div_s()
    }

    fn div_f32(&mut self, a: f32, b: f32) -> &mut Self {
        self.f32_const(a).f32_const(b).f32_div()
    }

    fn div_f64(&mut self, a: f64, b: f64) -> &mut Self {
        self.f64_const(a).f64_const(b).f64_div()
    }

    fn rem_i32(&mut self, a: i32, b: i32) -> &mut Self {
        self.i32_const(a).i32_const(b).i32_rem_s()
    }

    fn rem_i64(&mut self, a: i64, b: i64) -> &mut Self {
        self.i64_const(a).i64_const(b).i64_rem_s()
    }

    fn ret_i32(&mut self, v: i32) -> &mut Self {
        self.i32_const(v).ret()
    }

    fn ret_i64(&mut self, v: i64) -> &mut Self {
        self.i64_const(v).ret()
    }

    fn ret_f32(&mut self, v: f32) -> &mut Self {
        self.f32_const(v).ret()
    }

    fn ret_f64(&mut self, v: f64) -> &mut Self {
        self.f64_const(v).ret()
    }

    fn ret_str(&mut self, s: &str) -> &mut Self {
        self.str_const(s).ret()
    }
}
