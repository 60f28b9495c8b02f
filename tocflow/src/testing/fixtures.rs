//! Canned tables of contents and pages.

const SAMPLE_TOC: &str = "前言
第一章 计算机系统漫游
1.1 信息就是位+上下文
1.2 程序被其他程序翻译成不同的格式
第二章 信息的表示和处理
2.1 信息存储
2.2 整数表示
第三章 程序的机器级表示
附录A 错误处理";

const VERBOSE_TOC: &str = "Preface ........ ix
Chapter 1 Getting Started ........ 1
1.1 Installation ........ 2
1.2 Hello, World ........ 5
1.3 Hello, Cargo ........ 8
Chapter 2 Programming a Guessing Game ........ 13
Chapter 3 Common Programming Concepts ........ 31
3.1 Variables and Mutability ........ 32
3.2 Data Types ........ 36
3.3 Functions ........ 45
3.4 Control Flow ........ 52
Chapter 4 Understanding Ownership ........ 59
4.1 What Is Ownership ........ 60
4.2 References and Borrowing ........ 72
4.3 The Slice Type ........ 80
Appendix A Keywords ........ 503
Index ........ 521";

const TERSE_TOC: &str = "序
第一章 起源
第二章 发展
第三章 现状
第四章 未来
附录";

const NAVIGATION_NOISE: &str = "豆瓣首页
登录/注册
1. 读书
2. 电影
3. 音乐
下载豆瓣客户端
< 前页 1 2 3 后页 >";

const DETAIL_PAGE: &str = r#"<!DOCTYPE html>
<html lang="zh-CN">
<head>
<meta charset="utf-8">
<title>深入理解计算机系统 (豆瓣)</title>
<script type="application/ld+json">
{"@context": "http://schema.org", "@type": "Book", "name": "深入理解计算机系统", "author": [{"@type": "Person", "name": "Randal E. Bryant"}], "isbn": "9787111544937"}
</script>
</head>
<body>
<div id="db-global-nav"><a href="https://www.douban.com/">豆瓣首页</a> <a href="/accounts/login">登录/注册</a></div>
<h1><span property="v:itemreviewed">深入理解计算机系统</span></h1>
<div class="related_info">
<h2><span>目录</span></h2>
<div class="indent" id="dir_{id}_short">前言<br/>第一章 计算机系统漫游<br/>1.1 信息就是位+上下文<br/>· · · · · · (<a href="javascript:void(0)" onclick="$('#dir_{id}_short').hide();$('#dir_{id}_full').show();">更多</a>)</div>
<div class="indent" id="dir_{id}_full" style="display:none">前言<br/>第一章 计算机系统漫游<br/>1.1 信息就是位+上下文<br/>1.2 程序被其他程序翻译成不同的格式<br/>第二章 信息的表示和处理<br/>2.1 信息存储<br/>2.2 整数表示<br/>第三章 程序的机器级表示<br/>附录A 错误处理<br/>· · · · · · (<a href="javascript:void(0)" onclick="$('#dir_{id}_full').hide();$('#dir_{id}_short').show();">收起</a>)</div>
</div>
<div id="db-rec-section"><h2>喜欢读"深入理解计算机系统"的人也喜欢</h2><dl><dd><a href="/subject/1230413/">程序员的自我修养</a></dd></dl></div>
</body>
</html>"#;

const SEARCH_PAGE: &str = r#"<html><body>
<div class="result-list">
<div class="item-root"><a href="https://books.example.com/subject/{id}/" class="title-text">深入理解计算机系统</a></div>
<div class="item-root"><a href="https://books.example.com/subject/1230413/" class="title-text">程序员的自我修养</a></div>
</div>
</body></html>"#;

/// A short mixed-pattern table of contents that validates.
#[must_use]
pub fn sample_toc() -> &'static str {
    SAMPLE_TOC
}

/// A long table of contents with page trailers.
#[must_use]
pub fn verbose_toc() -> &'static str {
    VERBOSE_TOC
}

/// Short lines that only validate through pattern diversity.
#[must_use]
pub fn terse_toc() -> &'static str {
    TERSE_TOC
}

/// Site chrome that looks numbered but must be rejected.
#[must_use]
pub fn navigation_noise() -> &'static str {
    NAVIGATION_NOISE
}

/// A detail page whose `#dir_{id}_full` container holds [`sample_toc`].
#[must_use]
pub fn detail_page(id: &str) -> String {
    DETAIL_PAGE.replace("{id}", id)
}

/// A search results page whose first hit is `id`.
#[must_use]
pub fn search_page(id: &str) -> String {
    SEARCH_PAGE.replace("{id}", id)
}

/// An Open Library edition record holding [`verbose_toc`]-style entries.
#[must_use]
pub fn open_library_edition() -> serde_json::Value {
    serde_json::json!({
        "key": "/books/OL26491053M",
        "title": "The Rust Programming Language",
        "isbn_13": ["9781718503106"],
        "table_of_contents": [
            {"level": 0, "label": "", "title": "Preface", "pagenum": "ix"},
            {"level": 0, "label": "1.", "title": "Getting Started", "pagenum": "1"},
            {"level": 0, "label": "2.", "title": "Programming a Guessing Game", "pagenum": "13"},
            {"level": 0, "label": "3.", "title": "Common Programming Concepts", "pagenum": "31"},
            {"level": 0, "label": "4.", "title": "Understanding Ownership", "pagenum": "59"},
            {"level": 0, "label": "", "title": "Index", "pagenum": "521"}
        ]
    })
}
