use casefile_extract_data::{sniff_delimiter, split_record};

#[test]
fn semicolon_export_from_outside_the_crate() {
    let text = "name;amount;note\n\"Doe; Jane\";12;\"said \"\"hi\"\"\"\nRoe;7;\n";
    let delim = sniff_delimiter(text, ',');
    assert_eq!(delim, ';');
    let second = text.lines().nth(1).unwrap();
    assert_eq!(split_record(second, delim), vec!["Doe; Jane", "12", "said \"hi\""]);
}
