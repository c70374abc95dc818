use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::prelude::*;

use relstore::{AttrType, Attribute, EngineConfig, Op, StorageEngine, StoreError};

const STUDENTS: [(f64, &str, f64); 6] = [
    (1.0, "ada", 91.5),
    (2.0, "brian", 78.0),
    (3.0, "grace", 88.0),
    (4.0, "linus", 64.5),
    (5.0, "barbara", 97.0),
    (6.0, "ken", 88.0),
];

fn main() -> Result<()> {
    let fmt_layer = tracing_subscriber::fmt::layer().compact();
    let filter_layer = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    println!("Relstore - a block-oriented relational storage engine");
    println!("=====================================================\n");

    let db_path = "demo.disk";
    let config = EngineConfig::default().with_disk_blocks(256);
    let mut engine = StorageEngine::create(db_path, config)
        .with_context(|| format!("failed to create disk image {}", db_path))?;

    engine.create_rel(
        "Students",
        &[
            ("roll", AttrType::Number),
            ("name", AttrType::Text),
            ("marks", AttrType::Number),
        ],
    )?;
    let rel_id = engine.open_rel("Students")?;
    println!("Created and opened relation Students (id {})", rel_id);

    for (roll, name, marks) in STUDENTS {
        let record = [Attribute::from(roll), Attribute::text(name)?, Attribute::from(marks)];
        let rec_id = engine.insert(rel_id, &record)?;
        println!("Inserted {:>7} at block {} slot {}", name, rec_id.block, rec_id.slot);
    }

    engine.create_index("Students", "marks")?;
    info!("index built on Students.marks");

    println!("\nIndexed search: marks >= 88");
    let target = Attribute::from(88.0);
    engine.open_rels_mut().reset_attr_search_index(rel_id, "marks")?;
    loop {
        match engine.search(rel_id, "marks", &target, Op::Ge) {
            Ok(row) => println!("  - {} {} {}", row[0], row[1], row[2]),
            Err(StoreError::NotFound) => break,
            Err(e) => return Err(e.into()),
        }
    }

    println!("\nLinear search: name = grace");
    engine.open_rels_mut().reset_rel_search_index(rel_id)?;
    let row = engine.search(rel_id, "name", &Attribute::text("grace")?, Op::Eq)?;
    println!("  - {} {} {}", row[0], row[1], row[2]);

    println!("\nProjection of every row:");
    engine.open_rels_mut().reset_rel_search_index(rel_id)?;
    loop {
        match engine.project(rel_id) {
            Ok(row) => println!("  - {} {} {}", row[0], row[1], row[2]),
            Err(StoreError::NotFound) => break,
            Err(e) => return Err(e.into()),
        }
    }

    engine.close_rel(rel_id)?;
    engine.rename_rel("Students", "Alumni")?;
    engine.rename_attr("Alumni", "marks", "grade")?;
    println!("\nRenamed Students to Alumni and marks to grade");

    let rel_id = engine.open_rel("Alumni")?;
    engine.open_rels_mut().reset_attr_search_index(rel_id, "grade")?;
    let row = engine.search(rel_id, "grade", &Attribute::from(90.0), Op::Gt)?;
    println!("First alumnus above 90 through the renamed index: {}", row[1]);
    engine.close_rel(rel_id)?;

    engine.delete_rel("Alumni")?;
    match engine.open_rel("Alumni") {
        Err(StoreError::RelNotExist) => println!("Dropped relation Alumni"),
        other => anyhow::bail!("relation still present after delete: {:?}", other),
    }

    engine.close()?;
    info!("engine closed");

    std::fs::remove_file(db_path).ok();
    println!("\nDemo completed successfully!");
    Ok(())
}
