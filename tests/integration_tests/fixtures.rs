//! Test fixtures for integration tests
//!
//! Provides sample pages and source records in the on-disk wire format

use serde_json::{json, Value};

/// A page that passes on the whitelist
pub const NOVEL_SITE_HTML: &str = r#"<!DOCTYPE html>
<html lang="zh">
<head>
    <meta charset="UTF-8">
    <title>笔趣阁_无弹窗小说网</title>
</head>
<body>
    <ul class="nav"><li>首页</li><li>书架</li><li>排行</li></ul>
    <div class="update">最新章节列表</div>
</body>
</html>
"#;

/// A domain parking page
pub const PARKED_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><title>example.net</title></head>
<body>
    <h1>Buy this domain</h1>
    <p>The domain owner may be willing to sell. Make an offer.</p>
</body>
</html>
"#;

/// A raw source record as found in an import file
pub fn wire_record(url: &str, name: &str, group: &str, source_type: i64) -> Value {
    json!({
        "bookSourceUrl": url,
        "bookSourceName": name,
        "bookSourceGroup": group,
        "bookSourceType": source_type,
        "enabled": true,
        "ruleSearch": { "bookList": "class.list@tag.li", "name": "tag.a@text" },
    })
}

/// A mixed import batch: two records on one domain, one on another, one
/// comic and one with an IP literal
pub fn sample_batch() -> Vec<Value> {
    vec![
        wire_record("https://www.biquge.info/search", "🔥笔趣阁（精品）", "精品,男频", 0),
        wire_record("m.biquge.info", "笔趣阁 手机版", "", 0),
        wire_record("https://www.qidian.com#老版", "起点中文网", "正版", 0),
        wire_record("https://manhua.example.org", "漫画站", "", 2),
        wire_record("http://192.168.1.20:8080/api", "局域网书源", "", 0),
    ]
}
