//! Pool behaviour under concurrent use.

use rayon::prelude::*;
use zenframe::{BufferPool, GridFactory, Image2D, Padding, PoolConfig};

#[test_log::test]
fn concurrent_rent_and_return() {
    let pool =
        BufferPool::<u32>::with_config(PoolConfig::default().with_max_buffers_per_bucket(64));
    (0..2000u32).into_par_iter().for_each(|i| {
        let mut lease = pool.rent(16usize << (i % 6));
        lease.fill(i);
        assert!(lease.iter().all(|&v| v == i));
    });

    let stats = pool.stats();
    assert_eq!(stats.rents, 2000);
    assert_eq!(stats.reused + stats.allocated, 2000);
    assert_eq!(stats.returned + stats.discarded, 2000);
    assert!(pool.retained() <= 6 * 64);
    assert!(stats.reused > 0);
}

#[test_log::test]
fn factories_share_one_pool_across_threads() {
    let pool = BufferPool::<f32>::new();
    let factory = GridFactory::new()
        .with_pool(pool.clone())
        .with_padding(Padding::Elements(8));

    let sums: Vec<f32> = (0..64)
        .into_par_iter()
        .map(|i| {
            factory
                .with_pooled(11, 3, None, true, |grid| {
                    grid.row_mut(i % 3).unwrap()[0] = 1.0;
                    grid.pixel_values().sum::<f32>()
                })
                .unwrap()
        })
        .collect();

    assert!(sums.iter().all(|&s| s == 1.0));
    assert_eq!(pool.stats().rents, 64);
    assert!(pool.retained() >= 1);
}

#[test_log::test]
fn rows_of_one_view_process_in_parallel() {
    let factory = GridFactory::<u16>::new();
    let mut owned = factory.create_pooled(100, 50, None, true).unwrap();
    let grid = owned.grid_mut().unwrap();
    let mut view = grid.view_mut();
    let rows: Vec<&mut [u16]> = view.padded_rows_mut().collect();
    rows.into_par_iter().enumerate().for_each(|(y, row)| {
        row.fill(y as u16);
    });

    for pixel in grid.pixels() {
        assert_eq!(pixel.value, pixel.row as u16);
    }
}

#[test_log::test]
fn release_makes_storage_available_again() {
    let factory = GridFactory::<u8>::new().with_padding(Padding::NONE);
    let mut first = factory.create_pooled(64, 64, None, false).unwrap();
    let ptr = first.grid().unwrap().storage().as_ptr();
    first.release();

    let second = factory.create_pooled(60, 60, None, false).unwrap();
    assert_eq!(second.grid().unwrap().storage().as_ptr(), ptr);
    assert_eq!(factory.pool().stats().reused, 1);
}
