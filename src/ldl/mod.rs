//! Editable dense LDLᵀ factorization.
//!
//! The solver maintains a factorization of the reduced KKT matrix whose
//! dimension changes as inequality constraints enter and leave the active
//! set, and whose diagonal blocks change when the proximal penalties move.
//! This module provides a dense unpivoted L·D·Lᵀ store that supports those
//! edits without refactorizing from scratch: rank-one updates, and
//! insertion or deletion of a symmetric row/column pair at an arbitrary
//! position.
//!
//! Storage is allocated once at a fixed capacity.  All edit operations
//! work in place on the capacity-sized buffers, so no allocation happens
//! during a solve.

#![allow(non_snake_case)]

mod ldl;
pub use ldl::*;
