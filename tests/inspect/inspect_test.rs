use boltpage::{
    inspect::{
        PageInfo,
        commands::{Command, CommandError, execute, run_line},
        describe_elements, dump, escape_bytes, hex_string,
    },
    storage::page_reader::PageReader,
    types::{
        FREELIST_COUNT_OVERFLOW, FREELIST_PAGE_FLAG, LEAF_PAGE_FLAG, PAGE_HEADER_SIZE, PageSize,
        element::{BranchEntry, LeafEntry},
        error::PageError,
        page::{Page, PageMut},
    },
    utils::{
        hash::{calculate_page_checksum, verify_page_checksum},
        mock::{TempPageFile, blank_page, branch_page, leaf_page},
    },
};

fn run(reader: &mut PageReader, input: &str) -> Result<String, CommandError> {
    let mut out = Vec::new();
    execute(reader, &Command::parse(input)?, &mut out)?;
    Ok(String::from_utf8(out).unwrap())
}

/// A single page file holding `buf` as page 0.
fn single_page_file(buf: &[u8]) -> TempPageFile {
    let mut file = TempPageFile::new(PageSize::default()).unwrap();
    file.write_page(buf).unwrap();
    file
}

fn sample_file() -> TempPageFile {
    let mut file = TempPageFile::new(PageSize::default()).unwrap();
    let page_size = file.page_size;

    let mut meta = blank_page(page_size, 0, 0);
    PageMut::new(&mut meta).unwrap().set_flags(boltpage::types::META_PAGE_FLAG);
    file.write_page(&meta).unwrap();

    let mut freelist = blank_page(page_size, 1, 0);
    PageMut::new(&mut freelist).unwrap().write_freelist(&[5, 6, 9]).unwrap();
    file.write_page(&freelist).unwrap();

    let branch = branch_page(
        page_size,
        2,
        &[BranchEntry::new(b"a", 3), BranchEntry::new(b"m", 4)],
    )
    .unwrap();
    file.write_page(&branch).unwrap();

    let leaf = leaf_page(
        page_size,
        3,
        &[LeafEntry::new(b"apple", b"red"), LeafEntry::bucket(b"box", b"\x00\x01")],
    )
    .unwrap();
    file.write_page(&leaf).unwrap();
    file
}

#[test]
fn test_hex_string_reads_raw_prefix() {
    let mut buf = vec![0u8; 32];
    buf[0] = 0xde;
    buf[1] = 0xad;
    buf[8] = 0xff; // flags nobody recognizes
    let page = Page::new(&buf).unwrap();

    assert_eq!(hex_string(&page, 2), "dead");
    assert_eq!(hex_string(&page, 0), "");
    assert_eq!(hex_string(&page, 10).len(), 20);
    assert_eq!(&hex_string(&page, 10)[16..], "ff00");
}

#[test]
fn test_dump_writes_one_hex_line() {
    let mut buf = blank_page(PageSize::default(), 0x0102, 0);
    PageMut::new(&mut buf).unwrap().set_flags(0x10);
    let page = Page::new(&buf).unwrap();

    let mut out = Vec::new();
    dump(&page, 16, &mut out).unwrap();
    // id(8) | flags(2) | count(2) | overflow(4)
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "0201000000000000\
         1000\
         0000\
         00000000\n"
    );
}

#[test]
fn test_page_info_summarizes_header() {
    let buf = leaf_page(PageSize::default(), 3, &[LeafEntry::new(b"k", b"v")]).unwrap();
    let page = Page::new(&buf).unwrap();
    let info = PageInfo::from_page(&page);

    assert_eq!(info.id, 3);
    assert_eq!(info.page_type, "leaf");
    assert_eq!(info.count, 1);
    assert_eq!(info.overflow_count, 0);
    assert_eq!(info.checksum, calculate_page_checksum(&page));
    assert!(verify_page_checksum(&page, info.checksum));

    let json = serde_json::to_value(&info).unwrap();
    assert_eq!(json["type"], "leaf");
}

#[test]
fn test_checksum_changes_with_content() {
    let mut buf = leaf_page(PageSize::default(), 3, &[LeafEntry::new(b"k", b"v")]).unwrap();
    let before = calculate_page_checksum(&Page::new(&buf).unwrap());
    let last = buf.len() - 1;
    buf[last] ^= 0xff;
    let page = Page::new(&buf).unwrap();
    assert!(!verify_page_checksum(&page, before));
}

#[test]
fn test_escape_bytes() {
    assert_eq!(escape_bytes(b"plain key"), "plain key");
    assert_eq!(escape_bytes(b"\x00a\xff"), "\\x00a\\xff");
}

#[test]
fn test_describe_elements() {
    let buf = leaf_page(
        PageSize::default(),
        3,
        &[LeafEntry::new(b"apple", b"red"), LeafEntry::bucket(b"box", b"\x00")],
    )
    .unwrap();
    let lines = describe_elements(&Page::new(&buf).unwrap()).unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "    0: key=\"apple\" value=\"red\"");
    assert_eq!(lines[1], "    1: key=\"box\" value=\"\\x00\" [bucket]");

    let buf = branch_page(PageSize::default(), 2, &[BranchEntry::new(b"m", 4)]).unwrap();
    let lines = describe_elements(&Page::new(&buf).unwrap()).unwrap();
    assert_eq!(lines, vec!["    0: key=\"m\" -> page 4".to_string()]);

    let meta = blank_page(PageSize::default(), 0, 0);
    assert!(describe_elements(&Page::new(&meta).unwrap()).unwrap().is_empty());
}

#[test]
fn test_command_parsing() {
    assert_eq!(Command::parse("").unwrap(), Command::Empty);
    assert_eq!(Command::parse("  HELP ").unwrap(), Command::Help);
    assert_eq!(Command::parse("q").unwrap(), Command::Exit);
    assert_eq!(Command::parse("info 3").unwrap(), Command::Info(3));
    assert_eq!(Command::parse("dump 3").unwrap(), Command::Dump(3, None));
    assert_eq!(Command::parse("dump 3 64").unwrap(), Command::Dump(3, Some(64)));
    assert_eq!(Command::parse("freelist 1").unwrap(), Command::Freelist(1));

    assert!(matches!(Command::parse("info"), Err(CommandError::Usage(_))));
    assert!(matches!(Command::parse("info x"), Err(CommandError::InvalidNumber(_))));
    assert!(matches!(Command::parse("frobnicate"), Err(CommandError::Unknown(_))));
}

#[test]
fn test_execute_commands_against_file() {
    let file = sample_file();
    let mut reader = PageReader::open(file.path(), file.page_size).unwrap();

    assert_eq!(run(&mut reader, "pages").unwrap(), "4 pages of 4096 bytes\n");
    assert_eq!(run(&mut reader, "freelist 1").unwrap(), "[5,6,9]\n");

    let info: serde_json::Value = serde_json::from_str(&run(&mut reader, "info 2").unwrap()).unwrap();
    assert_eq!(info["type"], "branch");
    assert_eq!(info["count"], 2);

    let elements = run(&mut reader, "elements 3").unwrap();
    assert!(elements.contains("key=\"apple\" value=\"red\""));
    assert!(elements.contains("[bucket]"));

    let hex = run(&mut reader, "dump 0 16").unwrap();
    assert_eq!(hex.trim_end().len(), 32);

    // whole page when no length is given
    let hex = run(&mut reader, "dump 0").unwrap();
    assert_eq!(hex.trim_end().len(), 2 * 4096);

    let mut out = Vec::new();
    assert!(!execute(&mut reader, &Command::Exit, &mut out).unwrap());
}

#[test]
fn test_execute_reports_wrong_page_type() {
    let file = sample_file();
    let mut reader = PageReader::open(file.path(), file.page_size).unwrap();

    assert!(matches!(
        run(&mut reader, "elements 0"),
        Err(CommandError::Page(PageError::UnexpectedPageType { id: 0, .. }))
    ));
    assert!(matches!(
        run(&mut reader, "freelist 3"),
        Err(CommandError::Page(PageError::UnexpectedPageType { id: 3, .. }))
    ));
    assert!(matches!(
        run(&mut reader, "info 99"),
        Err(CommandError::Page(PageError::PageOutOfRange { .. }))
    ));
}

#[test]
fn test_elements_marks_ranges_outside_page() {
    let mut buf = blank_page(PageSize::default(), 0, 0);
    let mut page = PageMut::new(&mut buf).unwrap();
    page.set_flags(LEAF_PAGE_FLAG);
    page.set_count(1);
    // flags(4) | pos(4) | ksize(4) | vsize(4)
    let elem = PAGE_HEADER_SIZE;
    buf[elem + 4..elem + 8].copy_from_slice(&0xFFFF_0000u32.to_le_bytes());
    buf[elem + 8..elem + 12].copy_from_slice(&4u32.to_le_bytes());

    let lines = describe_elements(&Page::new(&buf).unwrap()).unwrap();
    assert_eq!(
        lines,
        vec!["    0: key=\"<out of bounds>\" value=\"<out of bounds>\"".to_string()]
    );

    let file = single_page_file(&buf);
    let mut reader = PageReader::open(file.path(), file.page_size).unwrap();
    let out = run(&mut reader, "elements 0").unwrap();
    assert!(out.contains("<out of bounds>"));
}

#[test]
fn test_elements_rejects_directory_past_page() {
    let mut buf = blank_page(PageSize::default(), 0, 0);
    let mut page = PageMut::new(&mut buf).unwrap();
    page.set_flags(LEAF_PAGE_FLAG);
    page.set_count(u16::MAX);

    let file = single_page_file(&buf);
    let mut reader = PageReader::open(file.path(), file.page_size).unwrap();
    assert!(matches!(
        run(&mut reader, "elements 0"),
        Err(CommandError::Page(PageError::Corrupt { id: 0, .. }))
    ));
}

#[test]
fn test_freelist_rejects_length_past_page() {
    let mut buf = blank_page(PageSize::default(), 0, 0);
    let mut page = PageMut::new(&mut buf).unwrap();
    page.set_flags(FREELIST_PAGE_FLAG);
    page.set_count(FREELIST_COUNT_OVERFLOW);
    buf[PAGE_HEADER_SIZE..PAGE_HEADER_SIZE + 8].copy_from_slice(&1_000_000u64.to_le_bytes());

    let file = single_page_file(&buf);
    let mut reader = PageReader::open(file.path(), file.page_size).unwrap();
    assert!(matches!(
        run(&mut reader, "freelist 0"),
        Err(CommandError::Page(PageError::Corrupt { id: 0, .. }))
    ));
}

#[test]
fn test_run_line_reports_failures() {
    let file = sample_file();
    let mut reader = PageReader::open(file.path(), file.page_size).unwrap();
    let mut out = Vec::new();

    assert!(run_line(&mut reader, "pages", &mut out).unwrap());
    assert!(!run_line(&mut reader, "exit", &mut out).unwrap());
    assert!(matches!(
        run_line(&mut reader, "info 99", &mut out),
        Err(CommandError::Page(PageError::PageOutOfRange { .. }))
    ));
    assert!(matches!(
        run_line(&mut reader, "frobnicate", &mut out),
        Err(CommandError::Unknown(_))
    ));
}
