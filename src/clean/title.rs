/// Comparable base form of a book title.
///
/// Lowercased and trimmed, cut at the first `:` or `;` (subtitle), with a
/// leading `the ` or `a ` removed since catalogs disagree on articles.
///
/// ```
/// use tf_idf_join::clean::base_name;
///
/// assert_eq!(base_name("The Hobbit: or There and Back Again"), "hobbit");
/// assert_eq!(base_name("  A Game of Thrones; Book One "), "game of thrones");
/// ```
pub fn base_name(title: &str) -> String {
    let lower = title.to_lowercase();
    let main = lower.trim().split([':', ';']).next().unwrap_or_default();
    let main = main
        .strip_prefix("the ")
        .or_else(|| main.strip_prefix("a "))
        .unwrap_or(main);
    main.trim().to_string()
}
