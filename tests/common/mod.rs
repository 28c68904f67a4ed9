//! Common test helpers for pagecurl integration tests

use pagecurl::prelude::*;

/// Standard page grid used across scenarios
pub fn page_grid() -> PageMesh {
    PageMesh::flat_grid(1.0, 1.0, 16, 16)
}

/// Book with `n` identical pages and a modest stagger
pub fn test_book(n: usize) -> Book {
    let mut book = Book::new();
    for _ in 0..n {
        book.add_page(page_grid());
    }
    book.shuffle = 4.0;
    book
}

/// Largest per-vertex distance between two buffers
pub fn max_deviation(a: &[Vec3], b: &[Vec3]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (*x - *y).length())
        .fold(0.0, f32::max)
}
