use crate::models::{FlowerCategory, FlowerStock};

/// Default shop inventory, loaded when the inventory slot has never been
/// written. Mixes universal, Chinese, and Japanese materials so culture-aware
/// designs have something to draw on out of the box.
pub fn starter_inventory() -> Vec<FlowerStock> {
    use FlowerCategory::{Filler, Foliage, Main};

    let entry = |name: &str,
                 color: &str,
                 quantity: u32,
                 category: FlowerCategory,
                 unit_cost: f64,
                 retail_price: f64,
                 meaning: &str,
                 tags: &[&str]| {
        FlowerStock::new(
            name,
            color,
            quantity,
            quantity,
            category,
            unit_cost,
            retail_price,
            Some(meaning),
        )
        .with_tags(tags)
    };

    vec![
        // Universal / Western
        entry("白玫瑰", "#FFFFFF", 50, Main, 5.0, 12.0, "纯洁的爱", &["western", "universal"]),
        entry("粉玫瑰", "#FFC0CB", 30, Main, 5.0, 15.0, "初恋、感动", &["western", "universal"]),
        entry("向日葵", "#FFD700", 20, Main, 6.0, 10.0, "沉默的爱、忠诚", &["western", "universal"]),
        entry("尤加利叶", "#5F8575", 100, Foliage, 2.0, 5.0, "恩赐", &["western", "universal"]),
        entry("洋甘菊", "#FFFFE0", 60, Filler, 3.0, 8.0, "逆境中的坚强", &["western", "universal"]),
        entry("蓝色绣球", "#87CEEB", 15, Main, 15.0, 38.0, "圆满、团聚", &["western", "universal"]),
        entry("百合", "#FFFFFF", 20, Main, 8.0, 20.0, "百年好合", &["chinese", "western", "universal"]),
        entry("郁金香", "#FFA500", 25, Main, 6.0, 12.0, "体贴、高雅", &["western", "universal"]),
        entry("红玫瑰", "#DC143C", 60, Main, 6.0, 15.0, "热烈的爱", &["western", "universal"]),
        entry("粉康乃馨", "#FFB6C1", 40, Main, 4.0, 10.0, "母爱、感激", &["western", "universal"]),
        entry("扶郎花", "#FFA500", 30, Main, 3.0, 8.0, "互敬互爱、有毅力", &["western", "universal"]),
        entry("洋桔梗", "#E6E6FA", 30, Main, 8.0, 18.0, "真诚不变的爱", &["western", "universal"]),
        entry("满天星", "#FFFFFF", 50, Filler, 15.0, 35.0, "清纯、配角之爱", &["western", "universal"]),
        entry("龟背竹", "#228B22", 20, Foliage, 6.0, 15.0, "健康长寿", &["western", "universal"]),
        entry("天堂鸟", "#FF8C00", 10, Main, 18.0, 45.0, "自由、潇洒", &["western", "universal"]),
        // Chinese traditional
        entry("梅枝", "#FF6B8A", 15, Main, 12.0, 28.0, "傲骨凌霜、高洁", &["chinese"]),
        entry("兰花", "#E6E6FA", 10, Main, 25.0, 60.0, "高洁雅士、君子之风", &["chinese", "western"]),
        entry("竹枝", "#228B22", 30, Foliage, 5.0, 12.0, "虚怀若谷、清雅脱俗", &["chinese", "japanese"]),
        entry("菊花", "#FFD700", 25, Main, 8.0, 18.0, "长寿高洁、隐逸清雅", &["chinese", "japanese"]),
        entry("水仙", "#FFFACD", 20, Main, 10.0, 22.0, "高洁孤傲、思念", &["chinese"]),
        entry("芍药", "#FFB6C1", 12, Main, 18.0, 42.0, "娇羞之美、情有独钟", &["chinese", "western"]),
        // Japanese traditional
        entry("樱花枝", "#FFB7C5", 8, Main, 20.0, 48.0, "生命无常、美的瞬间", &["japanese"]),
        entry("椿花", "#DC143C", 10, Main, 15.0, 35.0, "完美之爱、谦逊", &["japanese"]),
        entry("松枝", "#2F4F4F", 25, Foliage, 8.0, 18.0, "坚忍不拔、永恒", &["japanese", "chinese"]),
        entry("桃花枝", "#FFB6C1", 12, Main, 12.0, 28.0, "春意盎然、桃花运", &["japanese", "chinese"]),
        // Chinese extended
        entry("牡丹", "#FF1493", 15, Main, 25.0, 68.0, "圆满、富贵、吉祥", &["chinese"]),
        entry("海棠", "#FF69B4", 10, Main, 18.0, 45.0, "游子思乡、温和", &["chinese"]),
        entry("红豆", "#FF0000", 40, Filler, 5.0, 12.0, "相思、喜庆", &["chinese", "universal"]),
        // Japanese extended
        entry("花菖蒲", "#8A2BE2", 15, Main, 12.0, 28.0, "优雅的心、信者之福", &["japanese"]),
        entry("枫叶枝", "#B22222", 20, Foliage, 10.0, 25.0, "秋之回忆、自制", &["japanese", "chinese"]),
        entry("文心兰", "#FFFF00", 25, Filler, 8.0, 20.0, "快乐无忧", &["japanese", "western"]),
        // Western extended
        entry("洋牡丹", "#FFDAB9", 30, Main, 10.0, 25.0, "迷人的魅力", &["western"]),
        entry("飞燕草", "#4169E1", 15, Main, 12.0, 30.0, "清静、正义、自由", &["western"]),
        entry("银莲花", "#800080", 20, Main, 10.0, 22.0, "期待、没有结果的爱", &["western"]),
        entry("尤加利果", "#556B2F", 50, Foliage, 6.0, 15.0, "恩赐、回忆", &["western", "universal"]),
    ]
}

#[cfg(test)]
mod tests {
    use super::starter_inventory;

    #[test]
    fn starter_inventory_is_well_formed() {
        let rows = starter_inventory();
        assert_eq!(rows.len(), 35);
        for row in &rows {
            assert!(!row.id.is_empty());
            assert_eq!(row.quantity, row.initial_stock);
            assert!(row.retail_price >= row.unit_cost);
            assert!(row.culture_tags.as_ref().is_some_and(|tags| !tags.is_empty()));
        }
    }
}
