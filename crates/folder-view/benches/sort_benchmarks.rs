//! Benchmarks for the item comparator, sorted insertion and resorting a populated view.
//!
//! Run with: `cargo bench --bench sort_benchmarks`
//! Results are saved to `target/criterion/` with HTML reports.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use folder_view::shell::{FileAttributes, FileMetadata};
use folder_view::sorting::{ItemComparator, sort_items};
use folder_view::{
    FolderSettings, FolderView, InMemoryNamespace, ItemId, ItemIdList, ItemInfo, ItemStore, ShellItem, ShellNamespace,
    SortDirection, SortMode, VecListDisplay, ViewOptions,
};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::hint::black_box;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A store with `count` items: every tenth a folder, names with embedded numbers so natural
/// ordering has work to do.
fn populated_store(count: usize) -> (ItemStore, Vec<ItemId>) {
    let extensions = ["txt", "pdf", "jpg", "png", "rs", "go", "ts", "md", "json", "toml"];
    let folder = ItemIdList::parse("/bench");
    let mut store = ItemStore::new();
    store.reset(folder.clone(), false);

    let ids = (0..count)
        .map(|i| {
            let is_folder = i % 10 == 0;
            let name = if is_folder {
                format!("Folder {}", i)
            } else {
                format!("file_{}.{}", (i * 7919) % count, extensions[i % extensions.len()])
            };
            let attributes = if is_folder { FileAttributes::DIRECTORY } else { FileAttributes::ARCHIVE };
            store.add_item(ShellItem {
                absolute_id: ItemIdList::parse(&format!("/bench/{}", name)),
                display_name: name.clone(),
                parsing_name: name,
                metadata: FileMetadata {
                    size: ((i * 104_729) % 1_000_000) as u64,
                    attributes,
                    ..FileMetadata::default()
                },
                metadata_valid: true,
                drive: None,
            })
        })
        .collect();
    (store, ids)
}

fn bench_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("sort_items");
    let no_sizes = HashMap::new();

    for count in [1_000, 10_000, 50_000] {
        let (store, ids) = populated_store(count);
        let items: Vec<&ItemInfo> = ids.iter().filter_map(|id| store.get(*id)).collect();

        for mode in [SortMode::Name, SortMode::Size, SortMode::Extension] {
            let comparator = ItemComparator::new(mode, SortDirection::Ascending, &no_sizes);
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", mode), count),
                &items,
                |b, items| {
                    b.iter(|| {
                        let mut refs = items.clone();
                        sort_items(&mut refs, &comparator);
                        black_box(refs.len())
                    })
                },
            );
        }
    }

    group.finish();
}

fn bench_sorted_insertion(c: &mut Criterion) {
    let mut group = c.benchmark_group("sorted_insertion");
    let no_sizes = HashMap::new();

    for count in [1_000, 10_000, 50_000] {
        let (store, ids) = populated_store(count);
        let comparator = ItemComparator::new(SortMode::Name, SortDirection::Ascending, &no_sizes);
        let compare = |a: ItemId, b: ItemId| match (store.get(a), store.get(b)) {
            (Some(a), Some(b)) => comparator.compare(a, b),
            _ => a.cmp(&b),
        };

        group.bench_with_input(BenchmarkId::from_parameter(count), &ids, |b, ids| {
            b.iter(|| {
                let mut order: Vec<ItemId> = Vec::with_capacity(ids.len());
                for id in ids {
                    let position = order.partition_point(|other| compare(*other, *id) == Ordering::Less);
                    order.insert(position, *id);
                }
                black_box(order.len())
            })
        });
    }

    group.finish();
}

/// A view showing `count` files, with only the first rows on screen so enrichment stays out
/// of the measurement.
fn populated_view(count: usize) -> Option<FolderView<VecListDisplay>> {
    let namespace = InMemoryNamespace::new();
    let folder = ItemIdList::parse("/bench");
    namespace.add_folder(&folder);
    for i in 0..count {
        let name = format!("/bench/file_{}.txt", (i * 7919) % count);
        namespace.add_file(&ItemIdList::parse(&name), ((i * 104_729) % 1_000_000) as u64);
    }
    let namespace: Arc<dyn ShellNamespace> = Arc::new(namespace);
    let options = ViewOptions {
        settings: FolderSettings::default(),
        watch_changes: false,
        ..ViewOptions::default()
    };

    let mut view = FolderView::new(namespace, VecListDisplay::new(), options).ok()?;
    view.set_visible_range(0..50);
    view.navigate(folder).ok()?;
    let deadline = Instant::now() + Duration::from_secs(60);
    while view.is_navigating() && Instant::now() < deadline {
        view.wait_for_message(Duration::from_millis(50));
    }
    Some(view)
}

fn bench_resort(c: &mut Criterion) {
    let mut group = c.benchmark_group("resort");
    group.sample_size(10);

    for count in [1_000, 10_000, 50_000] {
        let Some(mut view) = populated_view(count) else {
            continue;
        };
        let mut descending = false;
        group.bench_function(BenchmarkId::from_parameter(count), |b| {
            b.iter(|| {
                descending = !descending;
                let direction = if descending { SortDirection::Descending } else { SortDirection::Ascending };
                view.set_sort_direction(direction);
                view.process_pending_messages();
                black_box(view.num_visible_items())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_sort, bench_sorted_insertion, bench_resort);
criterion_main!(benches);
