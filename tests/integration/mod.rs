mod zero_page;
