use super::*;

fn set(range: impl IntoIterator<Item = u32>) -> BTreeSet<u32> {
    range.into_iter().collect()
}

#[test]
fn full_header_yields_both_closed_ranges() {
    let hunks = parse_hunks("@@ -33,5 +55,4 @@ \\section{Results}\n");
    assert_eq!(
        hunks,
        vec![HunkHeader {
            old_start: 33,
            old_count: 5,
            new_start: 55,
            new_count: 4,
        }]
    );

    let mut expected = set(33..=38);
    expected.extend(55..=59);
    assert_eq!(changed_lines("@@ -33,5 +55,4 @@"), expected);
}

#[test]
fn omitted_counts_are_zero() {
    assert_eq!(changed_lines("@@ -7 +9 @@"), set([7, 9]));
    assert_eq!(changed_lines("@@ -12,0 +13 @@"), set([12, 13]));
}

#[test]
fn non_numeric_counts_are_zero() {
    let hunks = parse_hunks("@@ -4,x +6,? @@");
    assert_eq!(hunks.len(), 1);
    assert_eq!(hunks[0].old_count, 0);
    assert_eq!(hunks[0].new_count, 0);
    assert_eq!(changed_lines("@@ -4,x +6,? @@"), set([4, 6]));
}

#[test]
fn multiple_hunks_are_merged() {
    let diff = "diff --git a/main.tex b/main.tex\n\
                index 1111111..2222222 100644\n\
                --- a/main.tex\n\
                +++ b/main.tex\n\
                @@ -3 +3 @@\n\
                -old\n\
                +new\n\
                @@ -10,2 +10,0 @@\n\
                -gone\n\
                -gone too\n";
    assert_eq!(changed_lines(diff), set([3, 10, 11, 12]));
}

#[test]
fn binary_diff_has_no_lines() {
    assert!(changed_lines("Binary files a/fig.png and b/fig.png differ\n").is_empty());
}
