use fleetsweep_aws::RESOURCE_NAMES;

/// 対応しているリソースタイプを1行に1つ表示
pub fn handle() {
    for name in RESOURCE_NAMES {
        println!("{}", name);
    }
}
