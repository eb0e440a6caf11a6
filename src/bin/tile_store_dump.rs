use base64::engine::general_purpose::STANDARD as BASE64_ENGINE;
use base64::Engine as _;
use tibia_house_store::persistence::prop_stream::PropReader;
use tibia_house_store::{SqliteStore, WorldStore};

fn read_header(reader: &mut PropReader<'_>) -> Option<(u16, u16, u8, u32)> {
    Some((
        reader.read_u16()?,
        reader.read_u16()?,
        reader.read_u8()?,
        reader.read_u32()?,
    ))
}

fn describe(data: &[u8]) -> String {
    match read_header(&mut PropReader::new(data)) {
        Some((x, y, z, count)) => format!("[{},{},{}] items={}", x, y, z, count),
        None => "[bad header]".to_string(),
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("usage: tile_store_dump <world.db> [house_id]");
        std::process::exit(2);
    }
    let house_filter = match args.get(2).map(|value| value.parse::<u32>()) {
        Some(Ok(id)) => Some(id),
        Some(Err(_)) => {
            eprintln!("tile_store_dump: house id must be a number");
            std::process::exit(2);
        }
        None => None,
    };

    let store = match SqliteStore::open(&args[1]) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("tile_store_dump: {}", err);
            std::process::exit(1);
        }
    };
    let rows = match store.tile_rows() {
        Ok(rows) => rows,
        Err(err) => {
            eprintln!("tile_store_dump: {}", err);
            std::process::exit(1);
        }
    };

    let mut shown = 0usize;
    for row in &rows {
        if house_filter.map_or(false, |id| id != row.house_id) {
            continue;
        }
        shown += 1;
        println!(
            "house={} {} bytes={} data={}",
            row.house_id,
            describe(&row.data),
            row.data.len(),
            BASE64_ENGINE.encode(&row.data)
        );
    }
    println!("rows: {} of {}", shown, rows.len());
}
