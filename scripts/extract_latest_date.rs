use std::error::Error;
use std::path::Path;
use twd_rate_history::config::OUTPUT_FILE;
use twd_rate_history::HistoryStore;

fn main() -> Result<(), Box<dyn Error>> {
    // 检查数据文件是否存在
    let history_path = Path::new(OUTPUT_FILE);
    if !history_path.exists() {
        return Err("数据文件不存在，请先运行 'cargo run --bin twd_rate_history'".into());
    }

    let store = HistoryStore::load_from_file(history_path)?;

    match store.latest() {
        Some((date, entry)) => {
            println!("最新汇率日期: {}", date);
            println!("币别数量: {}", entry.currency_count());
            println!("历史天数: {}", store.history.len());
            println!("最后更新(台北): {}", store.last_updated_taipei);
        }
        None => {
            return Err("历史数据为空".into());
        }
    }

    Ok(())
}
